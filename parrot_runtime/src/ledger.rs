use parrot_core::Value;

/// One recorded call: the caller context it originated from (outer to
/// inner), the operation name and the fully resolved positional arguments.
/// `arg_names` and `arg_values` always have equal length.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CallRecord {
    pub context: Vec<String>,
    pub operation: String,
    pub arg_names: Vec<String>,
    pub arg_values: Vec<Value>,
}

/// Ordered, append-only log of recorded calls for one target instance.
///
/// The owning [`Proxy`](crate::Proxy) appends during recording; the artifact
/// serializer reads it and clears it once a write has succeeded.
#[derive(Debug, Default)]
pub struct CallLedger {
    records: Vec<CallRecord>,
}

impl CallLedger {
    pub(crate) fn push(&mut self, record: CallRecord) {
        self.records.push(record);
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }

    pub fn records(&self) -> &[CallRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(op: &str) -> CallRecord {
        CallRecord {
            context: vec!["main".to_owned()],
            operation: op.to_owned(),
            arg_names: Vec::new(),
            arg_values: Vec::new(),
        }
    }

    #[test]
    fn records_keep_append_order() {
        let mut ledger = CallLedger::default();
        ledger.push(record("b"));
        ledger.push(record("a"));
        ledger.push(record("b"));
        let ops: Vec<_> = ledger.records().iter().map(|r| r.operation.as_str()).collect();
        assert_eq!(ops, ["b", "a", "b"]);
    }

    #[test]
    fn clear_empties_without_destroying() {
        let mut ledger = CallLedger::default();
        ledger.push(record("a"));
        ledger.clear();
        assert!(ledger.is_empty());
        ledger.push(record("b"));
        assert_eq!(ledger.len(), 1);
    }
}
