use prism_sql::Value;

/// Identity of a view instance: the concrete view type and its identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ViewKey {
    view: &'static str,
    id: Value,
}

impl ViewKey {
    /// The key of view `view` with identifier `id`.
    #[must_use]
    pub fn new(view: &'static str, id: impl Into<Value>) -> Self {
        Self { view, id: id.into() }
    }

    /// The view type name.
    #[must_use]
    pub const fn view(&self) -> &'static str {
        self.view
    }

    /// The identifier.
    #[must_use]
    pub const fn id(&self) -> &Value {
        &self.id
    }
}
