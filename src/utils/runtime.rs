use anyhow::Result;

/// Every mutation goes through a single `&mut Tracker`, there is nothing to gain from more
/// threads.
pub fn single_thread_runtime() -> Result<tokio::runtime::Runtime> {
    Ok(tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?)
}
