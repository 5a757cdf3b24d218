use tokio::select;
use tokio_util::sync::CancellationToken;

/// Cancels `cancelation` once the user presses Ctrl-C. Work in progress is expected to notice the
/// token between steps, nothing is interrupted mid-request.
pub async fn detect_shutdown(cancelation: CancellationToken) {
    select! {
        _ = tokio::signal::ctrl_c() => {
            cancelation.cancel();
        },
        _ = cancelation.cancelled() => (),
    };
}
