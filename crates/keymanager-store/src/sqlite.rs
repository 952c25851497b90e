//! SQLite persistence for account data and relay nonces.
//!
//! Backs the [`DataStore`] and [`NonceStore`] roles. Deployed code and the
//! account's call surface belong to the host and are not persisted here.

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use keymanager_core::{Address, Bytes, DataKey};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{DataStore, NonceStore};

/// SQLite-based store implementation.
///
/// Thread-safe via an internal Mutex.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory SQLite database.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn with_conn<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        f(&conn)
    }

    /// Write a raw value. An empty value deletes the key.
    pub fn put_data(&self, key: &DataKey, value: &[u8]) -> Result<()> {
        self.with_conn(|conn| {
            if value.is_empty() {
                conn.execute(
                    "DELETE FROM account_data WHERE data_key = ?1",
                    params![key.as_bytes().as_slice()],
                )?;
            } else {
                conn.execute(
                    "INSERT INTO account_data (data_key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(data_key) DO UPDATE SET value = excluded.value,
                                                         updated_at = excluded.updated_at",
                    params![key.as_bytes().as_slice(), value, now_millis()],
                )?;
            }
            Ok(())
        })
    }

    /// Apply several writes in one transaction.
    pub fn put_data_batch(&self, entries: &[(DataKey, Bytes)]) -> Result<()> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        let tx = conn.transaction()?;
        let now = now_millis();
        for (key, value) in entries {
            if value.is_empty() {
                tx.execute(
                    "DELETE FROM account_data WHERE data_key = ?1",
                    params![key.as_bytes().as_slice()],
                )?;
            } else {
                tx.execute(
                    "INSERT INTO account_data (data_key, value, updated_at) VALUES (?1, ?2, ?3)
                     ON CONFLICT(data_key) DO UPDATE SET value = excluded.value,
                                                         updated_at = excluded.updated_at",
                    params![key.as_bytes().as_slice(), &value[..], now],
                )?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    /// Every stored key, in byte order.
    pub fn keys(&self) -> Result<Vec<DataKey>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare("SELECT data_key FROM account_data ORDER BY data_key")?;
            let rows = stmt.query_map([], |row| row.get::<_, Vec<u8>>(0))?;
            let mut keys = Vec::new();
            for raw in rows {
                let raw = raw?;
                let key = DataKey::try_from(raw.as_slice()).map_err(|_| {
                    StoreError::InvalidData(format!("data key of {} bytes", raw.len()))
                })?;
                keys.push(key);
            }
            Ok(keys)
        })
    }
}

fn decode_u128(raw: &[u8], column: &str) -> Result<u128> {
    let arr: [u8; 16] = raw
        .try_into()
        .map_err(|_| StoreError::InvalidData(format!("{column} of {} bytes", raw.len())))?;
    Ok(u128::from_be_bytes(arr))
}

impl DataStore for SqliteStore {
    fn get_data(&self, key: &DataKey) -> Result<Bytes> {
        self.with_conn(|conn| {
            let value: Option<Vec<u8>> = conn
                .query_row(
                    "SELECT value FROM account_data WHERE data_key = ?1",
                    params![key.as_bytes().as_slice()],
                    |row| row.get(0),
                )
                .optional()?;
            Ok(value.map(Bytes::from).unwrap_or_default())
        })
    }
}

impl NonceStore for SqliteStore {
    fn nonce(&self, address: &Address, channel: u128) -> Result<u128> {
        self.with_conn(|conn| read_counter(conn, address, channel))
    }

    fn set_nonce(&self, address: &Address, channel: u128, counter: u128) -> Result<()> {
        self.with_conn(|conn| write_counter(conn, address, channel, counter))
    }

    fn compare_and_set_nonce(
        &self,
        address: &Address,
        channel: u128,
        expected: u128,
        new: u128,
    ) -> Result<bool> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| StoreError::LockPoisoned(e.to_string()))?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        if read_counter(&tx, address, channel)? != expected {
            return Ok(false);
        }
        write_counter(&tx, address, channel, new)?;
        tx.commit()?;
        Ok(true)
    }
}

fn read_counter(conn: &Connection, address: &Address, channel: u128) -> Result<u128> {
    let raw: Option<Vec<u8>> = conn
        .query_row(
            "SELECT counter FROM relay_nonces WHERE signer = ?1 AND channel = ?2",
            params![address.as_slice(), channel.to_be_bytes().as_slice()],
            |row| row.get(0),
        )
        .optional()?;
    match raw {
        Some(raw) => decode_u128(&raw, "counter"),
        None => Ok(0),
    }
}

fn write_counter(conn: &Connection, address: &Address, channel: u128, counter: u128) -> Result<()> {
    conn.execute(
        "INSERT INTO relay_nonces (signer, channel, counter, updated_at)
         VALUES (?1, ?2, ?3, ?4)
         ON CONFLICT(signer, channel) DO UPDATE SET counter = excluded.counter,
                                                    updated_at = excluded.updated_at",
        params![
            address.as_slice(),
            channel.to_be_bytes().as_slice(),
            counter.to_be_bytes().as_slice(),
            now_millis()
        ],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_data_round_trip() {
        let store = SqliteStore::open_memory().unwrap();
        let key = DataKey::from_bytes([7; 32]);
        assert!(store.get_data(&key).unwrap().is_empty());

        store.put_data(&key, b"first").unwrap();
        store.put_data(&key, b"second").unwrap();
        assert_eq!(store.get_data(&key).unwrap(), Bytes::from_static(b"second"));

        store.put_data(&key, &[]).unwrap();
        assert!(store.get_data(&key).unwrap().is_empty());
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn test_batch_is_ordered() {
        let store = SqliteStore::open_memory().unwrap();
        let a = DataKey::from_bytes([1; 32]);
        let b = DataKey::from_bytes([2; 32]);
        store
            .put_data_batch(&[
                (b, Bytes::from_static(b"b")),
                (a, Bytes::from_static(b"a")),
                (b, Bytes::new()),
            ])
            .unwrap();
        assert_eq!(store.keys().unwrap(), vec![a]);
    }

    #[test]
    fn test_nonce_counters() {
        let store = SqliteStore::open_memory().unwrap();
        let signer = Address::repeat_byte(0x11);
        assert_eq!(store.nonce(&signer, 0).unwrap(), 0);

        store.set_nonce(&signer, 0, 1).unwrap();
        store.set_nonce(&signer, u128::MAX, u128::MAX).unwrap();
        assert_eq!(store.nonce(&signer, 0).unwrap(), 1);
        assert_eq!(store.nonce(&signer, u128::MAX).unwrap(), u128::MAX);
        assert_eq!(store.nonce(&signer, 1).unwrap(), 0);
    }

    #[test]
    fn test_compare_and_set_only_moves_expected_counter() {
        let store = SqliteStore::open_memory().unwrap();
        let signer = Address::repeat_byte(0x12);
        assert!(store.compare_and_set_nonce(&signer, 4, 0, 1).unwrap());
        assert!(!store.compare_and_set_nonce(&signer, 4, 0, 1).unwrap());
        assert!(!store.compare_and_set_nonce(&signer, 4, 2, 1).unwrap());
        assert_eq!(store.nonce(&signer, 4).unwrap(), 1);

        assert!(store.compare_and_set_nonce(&signer, 4, 1, 0).unwrap());
        assert_eq!(store.nonce(&signer, 4).unwrap(), 0);
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("keymanager.db");
        let key = DataKey::from_bytes([9; 32]);
        let signer = Address::repeat_byte(0x22);

        {
            let store = SqliteStore::open(&path).unwrap();
            store.put_data(&key, b"kept").unwrap();
            store.set_nonce(&signer, 3, 42).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get_data(&key).unwrap(), Bytes::from_static(b"kept"));
        assert_eq!(store.nonce(&signer, 3).unwrap(), 42);
    }

    proptest! {
        #[test]
        fn prop_counter_round_trips(channel in any::<u128>(), counter in any::<u128>()) {
            let store = SqliteStore::open_memory().unwrap();
            let signer = Address::repeat_byte(0x33);
            store.set_nonce(&signer, channel, counter).unwrap();
            prop_assert_eq!(store.nonce(&signer, channel).unwrap(), counter);
        }
    }
}
