use crate::export::UserRow;

/// Callback invoked around custom-data handling for one imported account.
/// Receives the source row and the destination user ID.
pub type ActionHook = Box<dyn Fn(&UserRow, u64)>;

/// Callback contributing extra (meta key, value) pairs for an imported
/// account.
pub type CustomDataHook = Box<dyn Fn(&UserRow, u64) -> Vec<(String, String)>>;

/// Extension points for the account import pipeline.
///
/// Host plugins used these to carry plugin-private user data across sites:
/// `before` fires once the account exists at its destination, `custom_data`
/// contributes meta pairs, `after` fires when all meta has been written.
#[derive(Default)]
pub struct Hooks {
    before: Vec<ActionHook>,
    custom_data: Vec<CustomDataHook>,
    after: Vec<ActionHook>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_custom_data_before(&mut self, hook: impl Fn(&UserRow, u64) + 'static) {
        self.before.push(Box::new(hook));
    }

    pub fn on_custom_data(
        &mut self,
        hook: impl Fn(&UserRow, u64) -> Vec<(String, String)> + 'static,
    ) {
        self.custom_data.push(Box::new(hook));
    }

    pub fn on_custom_data_after(&mut self, hook: impl Fn(&UserRow, u64) + 'static) {
        self.after.push(Box::new(hook));
    }

    pub(crate) fn run_before(&self, row: &UserRow, user_id: u64) {
        for hook in &self.before {
            hook(row, user_id);
        }
    }

    /// Contributions from every filter, in registration order.
    pub(crate) fn collect_custom_data(&self, row: &UserRow, user_id: u64) -> Vec<(String, String)> {
        let mut pairs = Vec::new();
        for hook in &self.custom_data {
            pairs.extend(hook(row, user_id));
        }
        pairs
    }

    pub(crate) fn run_after(&self, row: &UserRow, user_id: u64) {
        for hook in &self.after {
            hook(row, user_id);
        }
    }
}
