fn main() {
    println!("Run `cargo test -p wire-compat` to execute wire compatibility tests.");
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use labdrop_protocol::{BindingParams, ChunkAck, CompletionResponse, ResourceId};

    /// Returns the path to the fixtures directory.
    fn fixtures_dir() -> PathBuf {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("fixtures")
    }

    /// Loads a fixture JSON file and returns it as a `serde_json::Value`.
    fn load_fixture(name: &str) -> serde_json::Value {
        let path = fixtures_dir().join(name);
        let data = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("failed to read fixture {}: {e}", path.display()));
        serde_json::from_str(&data)
            .unwrap_or_else(|e| panic!("failed to parse fixture {}: {e}", path.display()))
    }

    fn parse_fixture<T: serde::de::DeserializeOwned>(name: &str) -> T {
        serde_json::from_value(load_fixture(name))
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"))
    }

    /// Deserializes a fixture into a Rust type, re-serializes it, and compares
    /// the JSON values (order-independent).
    fn roundtrip_test<T>(name: &str)
    where
        T: serde::de::DeserializeOwned + serde::Serialize,
    {
        let fixture = load_fixture(name);
        let parsed: T = serde_json::from_value(fixture.clone())
            .unwrap_or_else(|e| panic!("failed to deserialize {name}: {e}"));
        let reserialized = serde_json::to_value(&parsed)
            .unwrap_or_else(|e| panic!("failed to re-serialize {name}: {e}"));

        assert_eq!(
            fixture, reserialized,
            "roundtrip mismatch for {name}:\n  server: {fixture}\n  client: {reserialized}"
        );
    }

    // --- Chunk acknowledgements ---

    #[test]
    fn fixture_chunk_ack() {
        roundtrip_test::<ChunkAck>("chunk_ack.json");
    }

    #[test]
    fn fixture_chunk_ack_numeric_id() {
        roundtrip_test::<ChunkAck>("chunk_ack_numeric_id.json");
        let ack: ChunkAck = parse_fixture("chunk_ack_numeric_id.json");
        assert_eq!(ack.session_id().as_deref(), Some("812"));
    }

    #[test]
    fn fixture_chunk_ack_ignores_extra_server_fields() {
        let ack: ChunkAck = parse_fixture("chunk_ack_server_full.json");
        assert_eq!(ack.offset, 1_548_576);
        assert_eq!(
            ack.session_id().as_deref(),
            Some("5b0c7e8e-2f41-4c55-9d6a-0a4b1f2c9e11")
        );
        assert_eq!(ack.filename.as_deref(), Some("plate_map.xlsx"));
    }

    // --- Completion responses ---

    #[test]
    fn fixture_completion_response() {
        roundtrip_test::<CompletionResponse>("completion_response.json");
        let resp: CompletionResponse = parse_fixture("completion_response.json");
        assert_eq!(resp.id, Some(ResourceId::Number(77)));
        assert_eq!(resp.extra.get("instrument"), Some(&serde_json::json!(7)));
    }

    #[test]
    fn fixture_completion_annotation_id_alias() {
        let resp: CompletionResponse = parse_fixture("completion_annotation_id.json");
        assert_eq!(resp.message, "Annotation created");
        assert_eq!(resp.id, Some(ResourceId::Number(1204)));
        assert!(!resp.extra.contains_key("annotation_id"));
        assert_eq!(resp.extra.get("stored_reagent"), Some(&serde_json::json!(12)));
    }

    // --- Binding metadata ---

    #[test]
    fn fixture_binding_params() {
        roundtrip_test::<BindingParams>("binding_params.json");
        let binding: BindingParams = parse_fixture("binding_params.json");
        let keys: Vec<&str> = binding.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["instrument", "annotation_type", "folder"]);
    }
}
