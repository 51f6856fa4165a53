//! Read-side algorithms over the sorted stores.
//!
//! Every operation is a pure function of store contents at call time; the
//! layer keeps no state of its own. Operations needing several independent
//! lookups issue them concurrently and fail fast — one failed lookup fails
//! the whole combination. Keys do most of the work: the scans below lean on
//! the codec's sort order instead of secondary indexes.

pub mod agency;
pub mod calendar;
pub mod routes;
pub mod schedule;
pub mod shapes;
pub mod stop_times;
pub mod stops;
pub mod trips;

pub use agency::get_agency;
pub use calendar::{describe_days, get_days, upcoming_exceptions, Weekday};
pub use routes::{connected_routes, get_route, list_routes};
pub use schedule::{
    route_schedule_table, stop_schedule_table, RouteScheduleTable, RouteTableRow, ScheduleHandle,
    StopScheduleEntry, StopScheduleTable,
};
pub use shapes::{get_all_points, get_shape_point, shape_as_geojson};
pub use stop_times::{
    first_and_last_stop, get_stop_time, get_trip_schedule, next_stop_from_list, next_stop_of_route,
    next_stop_of_trip, stop_times_for_stop, FirstAndLast,
};
pub use stops::{all_stops_as_geojson, get_stop, nearest_stop, stop_address};
pub use trips::{
    all_trips_for_route, current_trip, get_trip, sibling_trips, trip_name, trip_times,
    SiblingTrips, TimeRange,
};
