//! Shared fixture builder for integration tests

#![allow(dead_code)]

use std::collections::BTreeMap;

use cid::Cid as IpldCid;
use pdsview_repo::car::write_car_bytes;
use pdsview_repo::commit::Commit;
use pdsview_repo::mst::util::{compute_cid, node_to_cid};
use pdsview_repo::mst::{NodeData, NodeEntry};
use pdsview_repo::value::{self, Value};
use smol_str::SmolStr;

pub const DID: &str = "did:plc:ewvi7nxzyoun6zhxrhs64oiz";
pub const REV: &str = "3kznmn7xqxl22";

/// Collects blocks in insertion order and frames them as a CAR
#[derive(Default)]
pub struct ArchiveBuilder {
    blocks: Vec<(IpldCid, Vec<u8>)>,
}

impl ArchiveBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an arbitrary payload under its computed CID
    pub fn raw(&mut self, data: Vec<u8>) -> IpldCid {
        let cid = compute_cid(&data).unwrap();
        self.blocks.push((cid, data));
        cid
    }

    /// Add a record `{ $type, text }`
    pub fn record(&mut self, type_: &str, text: &str) -> IpldCid {
        self.raw(record_bytes(type_, text))
    }

    /// Add an MST node built from flat in-order entries
    pub fn node(&mut self, entries: &[NodeEntry]) -> IpldCid {
        let node = NodeData::from_entries(entries).unwrap();
        let (cid, bytes) = node_to_cid(&node).unwrap();
        self.blocks.push((cid, bytes));
        cid
    }

    /// Add a commit pointing at `mst_root`
    pub fn commit(&mut self, mst_root: IpldCid) -> IpldCid {
        let commit = Commit::new_unsigned(DID, mst_root, REV, None);
        self.raw(commit.to_cbor().unwrap())
    }

    pub fn finish(&self, root: IpldCid) -> Vec<u8> {
        write_car_bytes(
            &[root],
            self.blocks.iter().map(|(cid, data)| (*cid, data.as_slice())),
        )
        .unwrap()
    }
}

pub fn record_bytes(type_: &str, text: &str) -> Vec<u8> {
    let mut map = BTreeMap::new();
    map.insert(SmolStr::new("$type"), Value::from(type_));
    map.insert(SmolStr::new("text"), Value::from(text));
    value::encode(&Value::Object(map)).unwrap()
}

pub fn leaf(key: &str, value: IpldCid) -> NodeEntry {
    NodeEntry::Leaf {
        key: SmolStr::new(key),
        value,
    }
}

/// A two-level repository with records in three collections
///
/// Layout (keys sorted):
/// ```text
/// root:  [ l -> left ] app.bsky.feed.post/3k2 [ t -> right ]
/// left:  app.bsky.actor.profile/self, app.bsky.feed.like/3k1
/// right: app.bsky.feed.post/3k3, app.bsky.graph.follow/3k4
/// ```
pub fn sample_repo() -> Vec<u8> {
    let mut b = ArchiveBuilder::new();

    let profile = b.record("app.bsky.actor.profile", "hello");
    let like = b.record("app.bsky.feed.like", "like");
    let post2 = b.record("app.bsky.feed.post", "second");
    let post3 = b.record("app.bsky.feed.post", "third");
    let follow = b.record("app.bsky.graph.follow", "follow");

    let left = b.node(&[
        leaf("app.bsky.actor.profile/self", profile),
        leaf("app.bsky.feed.like/3k1", like),
    ]);
    let right = b.node(&[
        leaf("app.bsky.feed.post/3k3", post3),
        leaf("app.bsky.graph.follow/3k4", follow),
    ]);
    let root = b.node(&[
        NodeEntry::Tree(left),
        leaf("app.bsky.feed.post/3k2", post2),
        NodeEntry::Tree(right),
    ]);

    let commit = b.commit(root);
    b.finish(commit)
}
