//! Delete command: remove a job and its derived endpoint, cleaning up
//! orphaned pods when the controller already vanished

use anyhow::Result;

use gwm_engine::ClusterClient;

use crate::output;

pub async fn run(
    client: &ClusterClient,
    identifier: &str,
    namespace: Option<&str>,
    force: bool,
) -> Result<()> {
    let report = gwm_engine::delete(client, identifier, namespace, force).await?;

    if report.orphan_cleanup {
        output::print_info("controller was already gone; removed leftover pods");
    }
    if report.deleted {
        output::print_success(&format!("deleted '{identifier}'"));
    }
    if !report.confirmed && !force {
        output::print_warning(
            "deletion accepted but not yet visible; resources may take a moment to disappear",
        );
    }
    Ok(())
}
