use crate::db_types::PhoneStatus;
use crate::error::AppError;
use crate::repo::PhoneRepo;
use crate::twilio::{self, CallOutcome};
use crate::types::AppState;

use tokio::time::sleep;
use tracing::{error, warn};

/// Aggregate result of one batch dial.
#[derive(Debug, PartialEq, Eq)]
pub struct DispatchReport {
    pub attempted: usize,
    pub successful: usize,
}

/// Dial up to `limit` pending records, strictly in sequence, pausing a fixed
/// interval after every submission as a crude rate limit.
///
/// Not transactional: a batch that fails halfway leaves the dialed prefix
/// advanced and the remainder pending.  A rejected submission leaves its
/// record untouched; only an unexpected store failure aborts the batch.
pub async fn dispatch_pending(
    app_state: &AppState,
    limit: i64,
) -> Result<DispatchReport, AppError> {
    let pending = PhoneRepo::find_pending(&app_state.db_pool, limit)
        .await
        .map_err(|e| {
            error!(error=%e, "failed to load pending records");
            AppError("db error")
        })?;

    let attempted = pending.len();
    let mut successful = 0;
    for record in &pending {
        match twilio::submit_call(app_state, &record.number, record.id).await? {
            CallOutcome::Submitted { .. } => {
                PhoneRepo::update_status(&app_state.db_pool, record.id, PhoneStatus::Called)
                    .await
                    .map_err(|e| {
                        error!(error=%e, "failed to mark record called");
                        AppError("db error")
                    })?;
                successful += 1;
            }
            CallOutcome::Rejected { error } => {
                warn!(number=%record.number, error=%error, "call rejected; record left pending");
            }
        }
        sleep(app_state.config.dispatch_delay).await;
    }

    Ok(DispatchReport {
        attempted,
        successful,
    })
}
