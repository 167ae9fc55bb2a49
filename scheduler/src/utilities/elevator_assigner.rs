/// ----- ELEVATOR ASSIGNER -----
/// Stateless selection of the car that should serve a new request, given a
/// fresh status from every candidate car.
///
/// 1. A car that already stops at the request's floor in the request's
///    direction takes it.
/// 2. Otherwise only idle cars are considered, unless none are idle.
/// 3. The car closest to the request's floor wins; the first one listed wins
///    a tie.

use shared_resources::elevator_status::ElevatorStatus;
use shared_resources::request::Request;

pub fn select_best_elevator(statuses: &[ElevatorStatus], request: &Request) -> Option<u8> {
    let direction = request.direction()?;
    let available: Vec<&ElevatorStatus> = statuses.iter().filter(|status| status.in_service).collect();

    if let Some(status) = available
        .iter()
        .find(|status| status.has_stop_at(request.floor, direction))
    {
        return Some(status.elevator_id);
    }

    let idle: Vec<&ElevatorStatus> = available.iter().copied().filter(|status| status.is_idle()).collect();
    let candidates = if idle.is_empty() { available } else { idle };

    candidates
        .iter()
        .min_by_key(|status| status.floor.abs_diff(request.floor))
        .map(|status| status.elevator_id)
}
