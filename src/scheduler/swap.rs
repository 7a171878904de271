use super::{Backend, SchedError, Scheduler, SwapAction};
use crate::model::{ShiftId, StaffId, StaffRole, SwapRequest, SwapRequestId, SwapStatus};
use tracing::info;

pub(super) fn create<S: Backend>(
    scheduler: &Scheduler<S>,
    requester: &StaffId,
    shift_id: &ShiftId,
    requested: &StaffId,
    reason: &str,
) -> Result<SwapRequest, SchedError> {
    let store = &scheduler.store;
    let _held = scheduler.shift_locks.lock(shift_id)?;

    let shift = store
        .get_shift(shift_id)?
        .ok_or_else(|| SchedError::not_found("shift", shift_id))?;
    if &shift.staff_id != requester {
        return Err(SchedError::unauthorized(format!(
            "shift {shift_id} is not assigned to {requester}"
        )));
    }
    if requester == requested {
        return Err(SchedError::invalid_input("cannot request a swap with oneself"));
    }
    match store.staff_role(requested)? {
        Some(StaffRole::Staff) => {}
        Some(StaffRole::Admin) => {
            return Err(SchedError::unauthorized("only staff can take over a shift"))
        }
        None => return Err(SchedError::not_found("staff", requested)),
    }
    if shift.is_frozen() {
        return Err(SchedError::invalid_state(format!(
            "shift {shift_id} is {} and can no longer be swapped",
            shift.state()
        )));
    }
    let already_pending = store
        .swap_requests()?
        .iter()
        .any(|r| &r.shift_id == shift_id && r.is_pending());
    if already_pending {
        return Err(SchedError::invalid_state(format!(
            "shift {shift_id} already has a pending swap request"
        )));
    }

    let request = SwapRequest::new(
        shift_id.clone(),
        requester.clone(),
        requested.clone(),
        reason.trim(),
        scheduler.clock.now(),
    );
    store.insert_swap_request(request.clone())?;
    info!(request = %request.id, shift = %shift_id, from = %requester, to = %requested, "swap requested");
    Ok(request)
}

/// Réponse du membre sollicité.
pub(super) fn respond<S: Backend>(
    scheduler: &Scheduler<S>,
    id: &SwapRequestId,
    responder: &StaffId,
    action: SwapAction,
) -> Result<SwapRequest, SchedError> {
    let request = load(scheduler, id)?;
    if &request.requested_staff_id != responder {
        return Err(SchedError::unauthorized(format!(
            "only {} can respond to swap request {id}",
            request.requested_staff_id
        )));
    }
    resolve(scheduler, request, action)
}

/// Décision administrateur.
pub(super) fn decide<S: Backend>(
    scheduler: &Scheduler<S>,
    admin: &StaffId,
    id: &SwapRequestId,
    action: SwapAction,
) -> Result<SwapRequest, SchedError> {
    scheduler.require_admin(admin)?;
    let request = load(scheduler, id)?;
    resolve(scheduler, request, action)
}

fn load<S: Backend>(scheduler: &Scheduler<S>, id: &SwapRequestId) -> Result<SwapRequest, SchedError> {
    scheduler
        .store
        .get_swap_request(id)?
        .ok_or_else(|| SchedError::not_found("swap request", id))
}

fn resolve<S: Backend>(
    scheduler: &Scheduler<S>,
    request: SwapRequest,
    action: SwapAction,
) -> Result<SwapRequest, SchedError> {
    let store = &scheduler.store;
    let _staff = scheduler
        .staff_locks
        .lock_all([&request.requesting_staff_id, &request.requested_staff_id])?;
    let _shift = scheduler.shift_locks.lock(&request.shift_id)?;

    // relu sous verrou : une réponse concurrente a pu passer entre-temps
    let mut request = load(scheduler, &request.id)?;
    if !request.is_pending() {
        return Err(SchedError::invalid_state(format!(
            "swap request {} is already {}",
            request.id, request.status
        )));
    }

    request.status = match action {
        SwapAction::Decline => SwapStatus::Denied,
        SwapAction::Accept => {
            let mut shift = store
                .get_shift(&request.shift_id)?
                .ok_or_else(|| SchedError::not_found("shift", &request.shift_id))?;
            if shift.is_frozen() {
                return Err(SchedError::invalid_state(format!(
                    "shift {} is {} and can no longer be swapped",
                    shift.id,
                    shift.state()
                )));
            }
            if shift.staff_id != request.requesting_staff_id {
                return Err(SchedError::invalid_state(format!(
                    "shift {} is no longer assigned to {}",
                    shift.id, request.requesting_staff_id
                )));
            }
            shift.staff_id = request.requested_staff_id.clone();
            store.update_shift(&shift)?;
            SwapStatus::Approved
        }
    };
    request.resolved_at = Some(scheduler.clock.now());
    store.update_swap_request(&request)?;
    info!(request = %request.id, status = %request.status, "swap request resolved");
    Ok(request)
}
