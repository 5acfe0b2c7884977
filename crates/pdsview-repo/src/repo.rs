//! Read-only view over a repository export
//!
//! Loads a CAR archive into memory, resolves the root commit, and answers record
//! queries by walking the MST.

use bytes::Bytes;
use cid::Cid as IpldCid;
use smol_str::SmolStr;

use crate::car::parse_car_bytes;
use crate::commit::Commit;
use crate::error::{RepoError, Result};
use crate::mst::MstCursor;
use crate::mst::util::split_key;
use crate::storage::{BlockStore, MemoryBlockStore};
use crate::value::{self, Value};

/// A single record resolved through the MST
#[derive(Debug, Clone, PartialEq)]
pub struct RecordEntry {
    /// Collection NSID
    pub collection: SmolStr,
    /// Record key
    pub rkey: SmolStr,
    /// CID of the record block
    pub cid: IpldCid,
    /// Decoded record
    pub value: Value,
}

/// Repository loaded from a CAR export
#[derive(Debug, Clone)]
pub struct Repository {
    root: IpldCid,
    commit: Commit,
    store: MemoryBlockStore,
}

impl Repository {
    /// Load a repository from CAR bytes
    ///
    /// The first header root must name a block holding a valid commit.
    #[cfg_attr(feature = "tracing", tracing::instrument(level = "debug", skip_all))]
    pub fn from_car(bytes: impl Into<Bytes>) -> Result<Self> {
        let parsed = parse_car_bytes(bytes)?;
        let store = MemoryBlockStore::new_from_blocks(parsed.blocks);

        let commit_bytes = store
            .get(&parsed.root)
            .ok_or_else(|| RepoError::not_found("commit block", &parsed.root))?;
        let commit = Commit::from_cbor(&commit_bytes)
            .map_err(|e| e.with_context(format!("root block {} is not a commit", parsed.root)))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            did = %commit.did,
            rev = %commit.rev,
            blocks = store.len(),
            "loaded repository"
        );

        Ok(Self {
            root: parsed.root,
            commit,
            store,
        })
    }

    /// CID of the root commit block
    pub fn root(&self) -> &IpldCid {
        &self.root
    }

    /// The root commit
    pub fn commit(&self) -> &Commit {
        &self.commit
    }

    /// Number of blocks in the archive (duplicates collapsed)
    pub fn block_count(&self) -> usize {
        self.store.len()
    }

    /// Iterate MST leaves in key order
    pub fn leaves(&self) -> MstCursor<'_, MemoryBlockStore> {
        MstCursor::new(&self.store, self.commit.data)
    }

    /// All MST leaves, `(collection/rkey, record cid)`, in key order
    pub fn walk(&self) -> Result<Vec<(SmolStr, IpldCid)>> {
        self.leaves().collect()
    }

    /// Distinct collections named by MST keys, sorted
    pub fn collections(&self) -> Result<Vec<SmolStr>> {
        let mut collections: Vec<SmolStr> = Vec::new();
        for leaf in self.leaves() {
            let (key, _) = leaf?;
            let (collection, _) = split_leaf_key(&key)?;
            // Keys sharing a collection prefix are contiguous in MST order
            if collections.last().map(SmolStr::as_str) != Some(collection) {
                collections.push(SmolStr::new(collection));
            }
        }
        // `/` sorts after `.`, so MST order is not collection-name order
        collections.sort_unstable();
        collections.dedup();
        Ok(collections)
    }

    /// Record keys of `collection`, in MST order
    pub fn record_keys(&self, collection: &str) -> Result<Vec<SmolStr>> {
        Ok(self
            .collection_leaves(collection)?
            .into_iter()
            .map(|(rkey, _)| rkey)
            .collect())
    }

    /// Records of `collection`, in MST order
    ///
    /// Leaves whose record block is absent from the archive are skipped.
    pub fn list_records(&self, collection: &str) -> Result<Vec<RecordEntry>> {
        let mut records = Vec::new();
        for (rkey, cid) in self.collection_leaves(collection)? {
            if let Some(value) = self.load_record(&cid)? {
                records.push(RecordEntry {
                    collection: SmolStr::new(collection),
                    rkey,
                    cid,
                    value,
                });
            } else {
                #[cfg(feature = "tracing")]
                tracing::debug!(%collection, %rkey, %cid, "record block missing from archive");
            }
        }
        Ok(records)
    }

    /// A single record, or `None` if the key or its block is absent
    pub fn get_record(&self, collection: &str, rkey: &str) -> Result<Option<RecordEntry>> {
        let found = self
            .collection_leaves(collection)?
            .into_iter()
            .find(|(key, _)| key == rkey);

        let Some((rkey, cid)) = found else {
            return Ok(None);
        };
        Ok(self.load_record(&cid)?.map(|value| RecordEntry {
            collection: SmolStr::new(collection),
            rkey,
            cid,
            value,
        }))
    }

    fn collection_leaves(&self, collection: &str) -> Result<Vec<(SmolStr, IpldCid)>> {
        let mut leaves = Vec::new();
        for leaf in self.leaves() {
            let (key, cid) = leaf?;
            let (key_collection, rkey) = split_leaf_key(&key)?;
            if key_collection == collection {
                leaves.push((SmolStr::new(rkey), cid));
            } else if !leaves.is_empty() {
                // A collection's keys are contiguous, so the run has ended
                break;
            }
        }
        Ok(leaves)
    }

    fn load_record(&self, cid: &IpldCid) -> Result<Option<Value>> {
        match self.store.get(cid) {
            Some(data) => Ok(Some(value::decode(&data)?)),
            None => Ok(None),
        }
    }
}

fn split_leaf_key(key: &str) -> Result<(&str, &str)> {
    split_key(key).ok_or_else(|| RepoError::invalid_mst(format!("malformed record key: {:?}", key)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::car::write_car_bytes;
    use crate::error::RepoErrorKind;
    use crate::mst::util::{compute_cid, node_to_cid};
    use crate::mst::{NodeData, NodeEntry};
    use std::collections::BTreeMap;

    fn record(type_: &str, text: &str) -> Vec<u8> {
        let mut map = BTreeMap::new();
        map.insert(SmolStr::new("$type"), Value::from(type_));
        map.insert(SmolStr::new("text"), Value::from(text));
        value::encode(&Value::Object(map)).unwrap()
    }

    /// Builds a single-node repository; `keys` must be sorted
    fn build_car(keys: &[(&str, Option<Vec<u8>>)]) -> Vec<u8> {
        let mut blocks: Vec<(IpldCid, Vec<u8>)> = Vec::new();
        let mut entries = Vec::new();
        for (key, data) in keys {
            let cid = match data {
                Some(data) => {
                    let cid = compute_cid(data).unwrap();
                    blocks.push((cid, data.clone()));
                    cid
                }
                None => compute_cid(key.as_bytes()).unwrap(),
            };
            entries.push(NodeEntry::Leaf {
                key: SmolStr::new(*key),
                value: cid,
            });
        }

        let (mst_cid, mst_bytes) = node_to_cid(&NodeData::from_entries(&entries).unwrap()).unwrap();
        blocks.push((mst_cid, mst_bytes));

        let commit = Commit::new_unsigned("did:plc:testrepo", mst_cid, "3l3qo2vuowo2b", None);
        let commit_bytes = commit.to_cbor().unwrap();
        let commit_cid = compute_cid(&commit_bytes).unwrap();
        blocks.push((commit_cid, commit_bytes));

        write_car_bytes(
            &[commit_cid],
            blocks.iter().map(|(cid, data)| (*cid, data.as_slice())),
        )
        .unwrap()
    }

    fn sample() -> Repository {
        let car = build_car(&[
            ("app.bsky.feed.like/3aaa", Some(record("app.bsky.feed.like", "l1"))),
            ("app.bsky.feed.post/3aaa", Some(record("app.bsky.feed.post", "p1"))),
            ("app.bsky.feed.post/3bbb", None),
            ("app.bsky.feed.post/3ccc", Some(record("app.bsky.feed.post", "p3"))),
            ("app.bsky.graph.follow/3aaa", Some(record("app.bsky.graph.follow", "f1"))),
        ]);
        Repository::from_car(car).unwrap()
    }

    #[test]
    fn test_commit_resolved() {
        let repo = sample();
        assert_eq!(repo.commit().did, "did:plc:testrepo");
        assert_eq!(repo.commit().rev, "3l3qo2vuowo2b");
        assert_eq!(repo.block_count(), 6);
    }

    #[test]
    fn test_walk_and_collections() {
        let repo = sample();
        let keys: Vec<_> = repo.walk().unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys.len(), 5);
        assert_eq!(keys[0], "app.bsky.feed.like/3aaa");

        assert_eq!(
            repo.collections().unwrap(),
            ["app.bsky.feed.like", "app.bsky.feed.post", "app.bsky.graph.follow"]
        );
    }

    #[test]
    fn test_record_keys_and_missing_blocks() {
        let repo = sample();
        assert_eq!(
            repo.record_keys("app.bsky.feed.post").unwrap(),
            ["3aaa", "3bbb", "3ccc"]
        );

        let records = repo.list_records("app.bsky.feed.post").unwrap();
        let rkeys: Vec<_> = records.iter().map(|r| r.rkey.as_str()).collect();
        assert_eq!(rkeys, ["3aaa", "3ccc"]);
        assert_eq!(records[1].value.get("text"), Some(&Value::from("p3")));
        assert!(repo.list_records("com.example.none").unwrap().is_empty());
    }

    #[test]
    fn test_get_record() {
        let repo = sample();
        let entry = repo.get_record("app.bsky.feed.like", "3aaa").unwrap().unwrap();
        assert_eq!(entry.value.type_discriminator(), Some("app.bsky.feed.like"));
        assert!(repo.get_record("app.bsky.feed.post", "3bbb").unwrap().is_none());
        assert!(repo.get_record("app.bsky.feed.post", "zzz").unwrap().is_none());
    }

    #[test]
    fn test_collections_sorted_across_dot_and_slash() {
        // "a.b.c/x" precedes "a.b/x" in key order
        let car = build_car(&[
            ("com.ex.sub/1", Some(record("com.ex.sub.item", "a"))),
            ("com.ex/1", Some(record("com.ex.item", "b"))),
        ]);
        let repo = Repository::from_car(car).unwrap();
        assert_eq!(repo.collections().unwrap(), ["com.ex", "com.ex.sub"]);
        assert_eq!(repo.record_keys("com.ex").unwrap(), ["1"]);
    }

    #[test]
    fn test_missing_root_block() {
        let root = compute_cid(b"absent commit").unwrap();
        let car = write_car_bytes(&[root], std::iter::empty::<(IpldCid, &[u8])>()).unwrap();
        let err = Repository::from_car(car).unwrap_err();
        assert_eq!(err.kind(), &RepoErrorKind::NotFound);
    }

    #[test]
    fn test_root_not_a_commit() {
        let data = record("app.bsky.feed.post", "not a commit");
        let cid = compute_cid(&data).unwrap();
        let car = write_car_bytes(&[cid], [(cid, data.as_slice())]).unwrap();
        let err = Repository::from_car(car).unwrap_err();
        assert_eq!(err.kind(), &RepoErrorKind::InvalidCommit);
    }
}
