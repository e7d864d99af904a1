use crate::models::ContentRecord;

/// Records a rule derives while rewriting one record
///
/// Staged records are kept only if the record they came from completes.
/// Records derived from earlier records of the same run stay visible so a
/// rule does not derive the same thing twice.
#[derive(Debug)]
pub struct RewriteScope<'r> {
    earlier: &'r [ContentRecord],
    staged: Vec<ContentRecord>,
}

impl<'r> RewriteScope<'r> {
    pub fn new(earlier: &'r [ContentRecord]) -> Self {
        Self {
            earlier,
            staged: Vec::new(),
        }
    }

    pub fn stage(&mut self, record: ContentRecord) {
        self.staged.push(record);
    }

    /// First derived record matching `predicate`, this record's first
    pub fn find_derived(
        &self,
        predicate: impl Fn(&ContentRecord) -> bool,
    ) -> Option<&ContentRecord> {
        self.staged
            .iter()
            .chain(self.earlier.iter())
            .find(|record| predicate(record))
    }

    pub fn into_staged(self) -> Vec<ContentRecord> {
        self.staged
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_derived_sees_both_generations() {
        let earlier = vec![ContentRecord::new("old", "s", "external-resource")];
        let mut scope = RewriteScope::new(&earlier);
        scope.stage(ContentRecord::new("new", "s", "external-resource"));

        assert!(scope.find_derived(|r| r.text_id.as_str() == "old").is_some());
        assert!(scope.find_derived(|r| r.text_id.as_str() == "new").is_some());
        assert_eq!(scope.into_staged().len(), 1);
    }
}
