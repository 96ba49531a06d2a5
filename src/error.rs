/// Errors that can occur during HTML-to-blocks conversion.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum ConvertError {
    /// The tree builder produced no document root.
    #[error("tree construction produced no document")]
    Tree,
}
