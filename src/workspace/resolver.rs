use crate::scope::Scope;

/// Routes documents to the managed root that serves them
pub struct FolderResolver;

impl FolderResolver {
    /// Pick the managed root for `document`.
    ///
    /// Candidates are the roots that contain the document. Among file roots
    /// the most specific one (longest path) wins. An untitled document only
    /// ever matches the untitled root.
    pub fn resolve<'a, I>(roots: I, document: &Scope) -> Option<&'a Scope>
    where
        I: IntoIterator<Item = &'a Scope>,
    {
        roots
            .into_iter()
            .filter(|root| root.contains(document))
            .max_by_key(|root| {
                root.path()
                    .map(|path| path.as_os_str().len())
                    .unwrap_or_default()
            })
    }
}
