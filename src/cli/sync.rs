use anyhow::{bail, Result};
use tokio_util::sync::CancellationToken;

use crate::{
    sync::{sync_local_to_remote, SyncReport},
    utils::shutdown::detect_shutdown,
};

use super::App;

fn summary(report: &SyncReport) -> String {
    let mut text = format!(
        "Sync completed: {} habit(s) and {} entry(ies) pushed",
        report.habits_pushed, report.entries_pushed
    );
    if report.failures > 0 {
        text.push_str(&format!(", {} failed", report.failures));
    }
    if report.skipped_entries > 0 {
        text.push_str(&format!(
            ", {} entry(ies) wait for their habit",
            report.skipped_entries
        ));
    }
    if report.partial {
        text.push_str(", server data only partly merged");
    }
    text
}

/// Runs a sync until it finishes or Ctrl-C is pressed.
pub async fn run_sync(app: &App) -> Result<()> {
    let cancel = CancellationToken::new();
    let shutdown = tokio::spawn(detect_shutdown(cancel.clone()));

    let report = sync_local_to_remote(&app.journal, app.remote(), &cancel, |message, pct| {
        println!("[{pct:>3}%] {message}");
    })
    .await;

    cancel.cancel();
    let _ = shutdown.await;

    if !report.success {
        bail!(
            "Sync failed: {}",
            report.error.as_deref().unwrap_or("unknown")
        );
    }
    println!("{}", app.heading(&summary(&report)));
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::sync::SyncReport;

    use super::summary;

    #[test]
    fn test_summary() {
        let clean = SyncReport {
            success: true,
            habits_pushed: 2,
            entries_pushed: 5,
            ..Default::default()
        };
        assert_eq!(
            summary(&clean),
            "Sync completed: 2 habit(s) and 5 entry(ies) pushed"
        );

        let rough = SyncReport {
            failures: 1,
            skipped_entries: 3,
            partial: true,
            ..clean
        };
        assert_eq!(
            summary(&rough),
            "Sync completed: 2 habit(s) and 5 entry(ies) pushed, 1 failed, 3 entry(ies) wait for their habit, server data only partly merged"
        );
    }
}
