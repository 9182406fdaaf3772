mod state;

use anyhow::Result;

use crate::state::AppState;

pub async fn spawn_all(app: AppState, pattern: &str) -> Result<()> {
    state::spawn(app, pattern).await
}
