//! Subcommand handlers
//!
//! Each handler takes the archive bytes and writes its report to `out`, so the
//! handlers can be driven from tests without touching stdout.

use std::io::Write;

use bytes::Bytes;
use miette::{IntoDiagnostic, Result};
use pdsview_repo::{CarReader, Repository, classify_archive};
use serde_json::json;

use crate::cli::Command;

const PROFILE_COLLECTION: &str = "app.bsky.actor.profile";
const PROFILE_RKEY: &str = "self";

/// Dispatch one subcommand
pub fn run(command: &Command, archive: Bytes, json: bool, out: &mut impl Write) -> Result<()> {
    match command {
        Command::Collections { counts } => collections(archive, *counts, json, out),
        Command::Records { collection } => records(archive, collection, json, out),
        Command::Keys { collection } => keys(archive, collection, json, out),
        Command::Info => info(archive, json, out),
        Command::Profile => profile(archive, json, out),
    }
}

fn collections(archive: Bytes, counts: bool, json: bool, out: &mut impl Write) -> Result<()> {
    let collections = classify_archive(archive)?;
    let names = collections.sorted();
    if json {
        let value: serde_json::Value = if counts {
            names
                .iter()
                .map(|name| json!({ "collection": name, "count": collections.count(name) }))
                .collect()
        } else {
            json!(names)
        };
        return write_json(out, &value);
    }

    for name in names {
        if counts {
            writeln!(out, "{}\t{}", name, collections.count(name)).into_diagnostic()?;
        } else {
            writeln!(out, "{}", name).into_diagnostic()?;
        }
    }
    Ok(())
}

fn records(archive: Bytes, collection: &str, json: bool, out: &mut impl Write) -> Result<()> {
    let repo = Repository::from_car(archive)?;
    let records = repo.list_records(collection)?;
    if records.is_empty() {
        tracing::warn!(%collection, "no records found");
    }

    let did = &repo.commit().did;
    if json {
        let value: serde_json::Value = records
            .iter()
            .map(|r| {
                json!({
                    "uri": format!("at://{}/{}/{}", did, r.collection, r.rkey),
                    "cid": r.cid.to_string(),
                    "value": r.value.to_json(),
                })
            })
            .collect();
        return write_json(out, &value);
    }

    for r in &records {
        writeln!(out, "{}\t{}\t{}", r.rkey, r.cid, r.value.to_json()).into_diagnostic()?;
    }
    Ok(())
}

fn keys(archive: Bytes, collection: &str, json: bool, out: &mut impl Write) -> Result<()> {
    let repo = Repository::from_car(archive)?;
    let keys = repo.record_keys(collection)?;
    if keys.is_empty() {
        tracing::warn!(%collection, "no record keys found");
    }

    if json {
        return write_json(out, &json!(keys));
    }
    for key in &keys {
        writeln!(out, "{}", key).into_diagnostic()?;
    }
    Ok(())
}

fn profile(archive: Bytes, json: bool, out: &mut impl Write) -> Result<()> {
    let repo = Repository::from_car(archive)?;
    let did = &repo.commit().did;
    let Some(entry) = repo.get_record(PROFILE_COLLECTION, PROFILE_RKEY)? else {
        return Err(miette::miette!(
            code = "pdsview::no_profile",
            help = "The account may never have set a display name or avatar",
            "No profile record ({}/{}) in repository {}",
            PROFILE_COLLECTION,
            PROFILE_RKEY,
            did
        ));
    };

    let uri = format!("at://{}/{}/{}", did, entry.collection, entry.rkey);
    let value = entry.value.to_json();
    if json {
        return write_json(
            out,
            &json!({
                "did": did,
                "uri": uri,
                "cid": entry.cid.to_string(),
                "value": value,
            }),
        );
    }

    writeln!(out, "did: {}", did).into_diagnostic()?;
    writeln!(out, "uri: {}", uri).into_diagnostic()?;
    if let Some(fields) = value.as_object() {
        for (key, field) in fields.iter().filter(|(key, _)| key.as_str() != "$type") {
            match field.as_str() {
                Some(text) => writeln!(out, "{}: {}", key, text),
                None => writeln!(out, "{}: {}", key, field),
            }
            .into_diagnostic()?;
        }
    }
    Ok(())
}

fn info(archive: Bytes, json: bool, out: &mut impl Write) -> Result<()> {
    let reader = CarReader::open(archive.clone())?;
    let roots: Vec<String> = reader.roots().iter().map(ToString::to_string).collect();
    let frames = reader.frame_count();

    let repo = Repository::from_car(archive)?;
    let commit = repo.commit();
    let prev = commit.prev.map(|cid| cid.to_string());

    if json {
        return write_json(
            out,
            &json!({
                "version": reader.version(),
                "roots": roots,
                "frames": frames,
                "blocks": repo.block_count(),
                "commit": {
                    "did": commit.did,
                    "rev": commit.rev,
                    "version": commit.version,
                    "data": commit.data.to_string(),
                    "prev": prev,
                },
            }),
        );
    }

    writeln!(out, "CAR version:    {}", reader.version()).into_diagnostic()?;
    writeln!(out, "Roots:          {}", roots.join(", ")).into_diagnostic()?;
    writeln!(out, "Frames:         {}", frames).into_diagnostic()?;
    writeln!(out, "Unique blocks:  {}", repo.block_count()).into_diagnostic()?;
    writeln!(out, "DID:            {}", commit.did).into_diagnostic()?;
    writeln!(out, "Revision:       {}", commit.rev).into_diagnostic()?;
    writeln!(out, "Commit version: {}", commit.version).into_diagnostic()?;
    writeln!(out, "MST root:       {}", commit.data).into_diagnostic()?;
    writeln!(out, "Previous:       {}", prev.as_deref().unwrap_or("none")).into_diagnostic()?;
    Ok(())
}

fn write_json(out: &mut impl Write, value: &serde_json::Value) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value).into_diagnostic()?;
    writeln!(out).into_diagnostic()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdsview_repo::car::write_car_bytes;
    use pdsview_repo::commit::Commit;
    use pdsview_repo::mst::util::{compute_cid, node_to_cid};
    use pdsview_repo::mst::{NodeData, NodeEntry};
    use pdsview_repo::value::{self, Value};
    use std::collections::BTreeMap;

    fn record(type_: &str, text: &str) -> Vec<u8> {
        let mut map = BTreeMap::new();
        map.insert("$type".into(), Value::from(type_));
        map.insert("text".into(), Value::from(text));
        value::encode(&Value::Object(map)).unwrap()
    }

    /// Single-node repository; `leaves` are `(key, record)` in key order. Record blocks
    /// are written in reverse so archive order differs from key order.
    fn build(leaves: Vec<(&str, Vec<u8>)>) -> Bytes {
        let mut blocks = Vec::new();
        let mut entries = Vec::new();
        for (key, data) in leaves {
            let cid = compute_cid(&data).unwrap();
            entries.push(NodeEntry::Leaf {
                key: key.into(),
                value: cid,
            });
            blocks.insert(0, (cid, data));
        }

        let (node_cid, node_bytes) = node_to_cid(&NodeData::from_entries(&entries).unwrap()).unwrap();
        blocks.push((node_cid, node_bytes));

        let commit = Commit::new_unsigned("did:plc:cli", node_cid, "3kcli", None)
            .to_cbor()
            .unwrap();
        let commit_cid = compute_cid(&commit).unwrap();
        blocks.push((commit_cid, commit));

        let car = write_car_bytes(
            &[commit_cid],
            blocks.iter().map(|(cid, data)| (*cid, data.as_slice())),
        )
        .unwrap();
        Bytes::from(car)
    }

    fn archive() -> Bytes {
        build(vec![
            ("app.bsky.feed.post/3k1", record("app.bsky.feed.post", "p")),
            ("app.bsky.graph.follow/3k2", record("app.bsky.graph.follow", "f")),
        ])
    }

    fn archive_with_profile() -> Bytes {
        let mut map = BTreeMap::new();
        map.insert("$type".into(), Value::from("app.bsky.actor.profile"));
        map.insert("displayName".into(), Value::from("Alice"));
        map.insert("description".into(), Value::from("hello from the archive"));
        let profile = value::encode(&Value::Object(map)).unwrap();

        build(vec![
            ("app.bsky.actor.profile/self", profile),
            ("app.bsky.feed.post/3k1", record("app.bsky.feed.post", "p")),
        ])
    }

    fn run_on(archive: Bytes, command: Command, json: bool) -> Result<String> {
        let mut out = Vec::new();
        run(&command, archive, json, &mut out)?;
        Ok(String::from_utf8(out).unwrap())
    }

    fn output(command: Command, json: bool) -> String {
        run_on(archive(), command, json).unwrap()
    }

    #[test]
    fn test_collections_printed_sorted() {
        // Follow block comes first in the archive
        let text = output(Command::Collections { counts: false }, false);
        assert_eq!(text, "app.bsky.feed\napp.bsky.graph\n");

        let text = output(Command::Collections { counts: true }, false);
        assert_eq!(text, "app.bsky.feed\t1\napp.bsky.graph\t1\n");
    }

    #[test]
    fn test_collections_json() {
        let text = output(Command::Collections { counts: false }, true);
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value, json!(["app.bsky.feed", "app.bsky.graph"]));
    }

    #[test]
    fn test_records_json() {
        let text = output(
            Command::Records {
                collection: "app.bsky.feed.post".into(),
            },
            true,
        );
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value[0]["uri"], "at://did:plc:cli/app.bsky.feed.post/3k1");
        assert_eq!(value[0]["value"]["text"], "p");
    }

    #[test]
    fn test_keys() {
        let text = output(
            Command::Keys {
                collection: "app.bsky.graph.follow".into(),
            },
            false,
        );
        assert_eq!(text, "3k2\n");
    }

    #[test]
    fn test_info() {
        let text = output(Command::Info, false);
        assert!(text.contains("did:plc:cli"));
        assert!(text.contains("Frames:         4"));
    }

    #[test]
    fn test_profile_text() {
        let text = run_on(archive_with_profile(), Command::Profile, false).unwrap();
        assert_eq!(
            text,
            "did: did:plc:cli\n\
             uri: at://did:plc:cli/app.bsky.actor.profile/self\n\
             description: hello from the archive\n\
             displayName: Alice\n"
        );
    }

    #[test]
    fn test_profile_json() {
        let text = run_on(archive_with_profile(), Command::Profile, true).unwrap();
        let value: serde_json::Value = serde_json::from_str(&text).unwrap();
        assert_eq!(value["did"], "did:plc:cli");
        assert_eq!(value["value"]["displayName"], "Alice");
        assert_eq!(value["value"]["$type"], "app.bsky.actor.profile");
    }

    #[test]
    fn test_profile_missing() {
        let err = run_on(archive(), Command::Profile, false).unwrap_err();
        assert!(err.to_string().contains("No profile record"));
        assert!(err.to_string().contains("did:plc:cli"));
    }

    #[test]
    fn test_garbage_archive_fails() {
        let mut out = Vec::new();
        let err = run(
            &Command::Collections { counts: false },
            Bytes::from_static(b"\x05nope"),
            false,
            &mut out,
        );
        assert!(err.is_err());
        assert!(out.is_empty());
    }
}
