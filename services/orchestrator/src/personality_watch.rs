use tokio::time::{sleep, Duration};
use tracing::info;

/// Keeps the personality fresh while no requests arrive; requests also
/// call `maybe_reload`, and the loader's own rate limit dedupes the two.
pub async fn watch_personality(state: crate::state::SharedState) {
    let every = state
        .engine
        .personality()
        .interval()
        .max(Duration::from_millis(200));

    loop {
        sleep(every).await;

        if state.engine.personality().maybe_reload().await {
            let hash = state.engine.personality().hash().await;
            info!(%hash, "personality_watch: new prompt active");
        }
    }
}
