/// Formats an error and every error of its `source()` chain, one cause per line.
///
/// Used by the `Debug` implementation of the crate errors so logs show what caused a failure,
/// not only the outermost message.
pub fn error_chain_fmt(
    e: &(impl std::error::Error + 'static),
    f: &mut std::fmt::Formatter<'_>,
) -> std::fmt::Result {
    writeln!(f, "{}\n", e)?;
    for cause in error_chain(e).skip(1) {
        writeln!(f, "Caused by:\n\t{}", cause)?;
    }
    Ok(())
}

/// The error followed by each error of its `source()` chain
pub fn error_chain<'a>(
    e: &'a (dyn std::error::Error + 'static),
) -> impl Iterator<Item = &'a (dyn std::error::Error + 'static)> {
    std::iter::successors(Some(e), |current| current.source())
}
