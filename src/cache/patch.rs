use crate::json_field;

const ID_FIELD: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PatchOutcome {
    Patched,
    Skipped(SkipReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    RequestWithoutId,
    ResponseWithoutId,
}

/// Rewrites the top-level `id` of a cached json-rpc response with the id the
/// current request carries. Only the id value span changes; when either side has
/// no id the response is left exactly as stored.
pub fn patch_response_id(request_payload: &[u8], response_payload: &mut Vec<u8>) -> PatchOutcome {
    let request_id = match json_field::read_top_level_field(request_payload, ID_FIELD) {
        Some(id) => id,
        None => return PatchOutcome::Skipped(SkipReason::RequestWithoutId),
    };

    if json_field::write_top_level_field(response_payload, ID_FIELD, request_id) {
        PatchOutcome::Patched
    } else {
        PatchOutcome::Skipped(SkipReason::ResponseWithoutId)
    }
}
