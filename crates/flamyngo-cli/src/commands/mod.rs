//! Subcommand implementations.

pub mod check;
pub mod collections;
pub mod complete;
pub mod doc;
pub mod dump;
pub mod plot;
pub mod query;

/// Report a per-request failure without failing the process.
///
/// Errors that belong to the request (bad search text, unknown collection,
/// rejected conversion) are printed; everything else propagates.
pub(crate) fn report<T>(result: flamyngo_core::Result<T>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(err) if err.is_request_error() => {
            eprintln!("Error: {}", err);
            Ok(None)
        }
        Err(err) => Err(err.into()),
    }
}
