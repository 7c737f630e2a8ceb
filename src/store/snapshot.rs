use crate::core::loan::Loan;
use crate::core::user::User;
use crate::store::{StoreError, StoreResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// The complete contents of a ledger, as written to disk.
///
/// ```json
/// {
///   "users": [{ "id": 1, "name": "alice", "is_delinquent": false, "version": 0 }],
///   "loans": []
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSnapshot {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub loans: Vec<Loan>,
}

impl LedgerSnapshot {
    /// Load a snapshot from `path`. A missing file is an empty ledger.
    pub fn load(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Write the snapshot to `path` as pretty-printed JSON.
    ///
    /// The file is written next to its destination first and renamed into
    /// place.
    pub fn save(&self, path: impl AsRef<Path>) -> StoreResult<()> {
        let path = path.as_ref();
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|source| StoreError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, path).map_err(|source| StoreError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loan::LoanId;
    use crate::core::user::UserId;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;
    use tempfile::tempdir;

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempdir().unwrap();
        let snapshot = LedgerSnapshot::load(dir.path().join("no-such-ledger.json")).unwrap();
        assert!(snapshot.users.is_empty());
        assert!(snapshot.loans.is_empty());
    }

    #[test]
    fn test_save_and_load() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let snapshot = LedgerSnapshot {
            users: vec![User {
                id: UserId::new(1),
                name: "alice".into(),
                is_delinquent: true,
                version: 3,
            }],
            loans: vec![Loan {
                id: LoanId::new(1),
                user_id: UserId::new(1),
                amount: dec!(1000),
                term: 10,
                bill_amount: dec!(110),
                outstanding: dec!(900),
                create_time: created,
                update_time: created,
                version: 1,
            }],
        };

        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        snapshot.save(&path).unwrap();
        let loaded = LedgerSnapshot::load(&path).unwrap();

        assert_eq!(loaded, snapshot);
    }

    #[test]
    fn test_amounts_serialize_as_strings() {
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let loan = Loan {
            id: LoanId::new(1),
            user_id: UserId::new(1),
            amount: dec!(1000),
            term: 10,
            bill_amount: dec!(110.00),
            outstanding: dec!(1000),
            create_time: created,
            update_time: created,
            version: 0,
        };
        let value = serde_json::to_value(&loan).unwrap();
        assert_eq!(value["bill_amount"], "110.00");
        assert_eq!(value["user_id"], 1);
    }

    #[test]
    fn test_malformed_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("ledger.json");
        fs::write(&path, "{ not json").unwrap();
        let err = LedgerSnapshot::load(&path).unwrap_err();
        assert!(matches!(err, StoreError::Serialization(_)));
    }
}
