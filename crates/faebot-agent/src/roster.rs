use faebot_core::{FaebotError, Result};

/// Ordered list of model identifiers that `switch` cycles through.
#[derive(Debug, Clone)]
pub struct ModelRoster {
    models: Vec<String>,
}

impl ModelRoster {
    pub fn new(models: Vec<String>) -> Result<Self> {
        let models: Vec<String> = models
            .into_iter()
            .map(|m| m.trim().to_string())
            .filter(|m| !m.is_empty())
            .collect();
        if models.is_empty() {
            return Err(FaebotError::Config("model roster is empty".to_string()));
        }
        Ok(Self { models })
    }

    /// Initial model for every newly observed channel.
    pub fn first(&self) -> &str {
        &self.models[0]
    }

    /// The entry after `current`, wrapping at the end. A model that is not in
    /// the roster (set by an administrator) restarts the cycle at the first.
    pub fn next_after(&self, current: &str) -> &str {
        match self.models.iter().position(|m| m == current) {
            Some(i) => &self.models[(i + 1) % self.models.len()],
            None => self.first(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster() -> ModelRoster {
        ModelRoster::new(vec!["A".into(), "B".into(), "C".into()]).unwrap()
    }

    #[test]
    fn cycles_and_wraps() {
        let r = roster();
        assert_eq!(r.next_after("A"), "B");
        assert_eq!(r.next_after("B"), "C");
        assert_eq!(r.next_after("C"), "A");
    }

    #[test]
    fn unknown_model_restarts_at_first() {
        assert_eq!(roster().next_after("owner/custom:abc"), "A");
    }

    #[test]
    fn single_entry_switches_to_itself() {
        let r = ModelRoster::new(vec!["only".into()]).unwrap();
        assert_eq!(r.next_after("only"), "only");
    }

    #[test]
    fn empty_roster_rejected() {
        assert!(ModelRoster::new(vec![]).is_err());
        assert!(ModelRoster::new(vec!["  ".into()]).is_err());
    }
}
