//! Synthetic container bytes for each direct-artifact format, shared by
//! `lodestone-formats` and `lodestone-http` test suites so neither has to hand-roll zip/tar
//! construction itself. Grounded on the same container libraries the adapters parse with
//! (`zip`, `tar`, `flate2`) — these are simply their write-side counterparts.
use std::io::Write;

use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;

fn zip_with_entry(entry_name: &str, contents: &[u8]) -> Bytes {
    let mut buf = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        let options = zip::write::FileOptions::default();
        writer.start_file(entry_name, options).expect("zip entry always starts");
        writer.write_all(contents).expect("zip write always succeeds");
        writer.finish().expect("zip always finishes");
    }
    Bytes::from(buf)
}

fn tar_gz_with_entries(entries: &[(&str, &[u8])]) -> Bytes {
    let mut buf = Vec::new();
    {
        let encoder = GzEncoder::new(&mut buf, Compression::default());
        let mut builder = tar::Builder::new(encoder);
        for (name, contents) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, *contents)
                .expect("tar append always succeeds");
        }
        builder.into_inner().expect("tar finish always succeeds").finish().expect("gzip finish always succeeds");
    }
    Bytes::from(buf)
}

fn tar_with_entries(entries: &[(&str, &[u8])]) -> Bytes {
    let mut buf = Vec::new();
    {
        let mut builder = tar::Builder::new(&mut buf);
        for (name, contents) in entries {
            let mut header = tar::Header::new_gnu();
            header.set_size(contents.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder
                .append_data(&mut header, name, *contents)
                .expect("tar append always succeeds");
        }
        builder.finish().expect("tar finish always succeeds");
    }
    Bytes::from(buf)
}

/// A minimal `.nupkg`: a zip archive with a single `.nuspec` entry.
pub fn nupkg(id: &str, version: &str) -> Bytes {
    let nuspec = format!(
        r#"<?xml version="1.0"?>
<package>
    <metadata>
        <id>{id}</id>
        <version>{version}</version>
        <authors>Test Author</authors>
        <description>a test package</description>
    </metadata>
</package>"#
    );
    zip_with_entry(&format!("{id}.nuspec"), nuspec.as_bytes())
}

/// A CouchDB-style npm publish envelope, with a single-entry `versions`/`_attachments` pair
/// wrapping a gzipped tarball carrying `package/package.json`.
pub fn npm_publish_payload(name: &str, version: &str) -> Bytes {
    use base64::Engine;

    let package_json = serde_json::json!({ "name": name, "version": version }).to_string();
    let tarball = tar_gz_with_entries(&[("package/package.json", package_json.as_bytes())]);
    let data_b64 = base64::engine::general_purpose::STANDARD.encode(&tarball);

    let payload = serde_json::json!({
        "name": name,
        "versions": {
            version: { "name": name, "version": version },
        },
        "_attachments": {
            format!("{name}-{version}.tgz"): { "data": data_b64 },
        },
    });
    Bytes::from(payload.to_string())
}

/// A crates.io-compatible publish frame: `<u32 LE metadata_len><metadata><u32 LE
/// crate_len><crate bytes>`.
pub fn cargo_publish_frame(name: &str, version: &str, crate_bytes: &[u8]) -> Bytes {
    let metadata = serde_json::json!({ "name": name, "vers": version }).to_string();
    let mut out = Vec::new();
    out.extend_from_slice(&(metadata.len() as u32).to_le_bytes());
    out.extend_from_slice(metadata.as_bytes());
    out.extend_from_slice(&(crate_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(crate_bytes);
    Bytes::from(out)
}

/// A `.gem`: a plain (non-gzipped) tar containing a gzipped Psych-shaped `metadata.gz`.
pub fn gem(name: &str, version: &str) -> Bytes {
    let yaml = format!(
        "--- !ruby/object:Gem::Specification\nname: {name}\nversion: !ruby/object:Gem::Version\n  version: {version}\n"
    );
    let metadata_gz = {
        let mut buf = Vec::new();
        let mut encoder = GzEncoder::new(&mut buf, Compression::default());
        encoder.write_all(yaml.as_bytes()).expect("gzip write always succeeds");
        encoder.finish().expect("gzip finish always succeeds");
        buf
    };
    tar_with_entries(&[("metadata.gz", &metadata_gz), ("data.tar.gz", b"")])
}

/// A Helm chart `.tgz`: a gzip'd tar with `Chart.yaml` at its root.
pub fn helm_chart(name: &str, version: &str) -> Bytes {
    let chart_yaml = format!("name: {name}\nversion: {version}\ndescription: a test chart\n");
    tar_gz_with_entries(&[(&format!("{name}/Chart.yaml"), chart_yaml.as_bytes())])
}

/// A Go module zip: every file nested under `{module}@{version}/`, including `go.mod`.
pub fn go_module_zip(module: &str, version: &str) -> Bytes {
    let go_mod = format!("module {module}\n\ngo 1.21\n");
    let mut buf = Vec::new();
    {
        let mut writer = zip::ZipWriter::new(std::io::Cursor::new(&mut buf));
        let options = zip::write::FileOptions::default();
        let prefix = format!("{module}@{version}");
        writer
            .start_file(format!("{prefix}/go.mod"), options)
            .expect("zip entry always starts");
        writer.write_all(go_mod.as_bytes()).expect("zip write always succeeds");
        writer
            .start_file(format!("{prefix}/go.sum"), options)
            .expect("zip entry always starts");
        writer.finish().expect("zip always finishes");
    }
    Bytes::from(buf)
}

/// An arbitrary OPA bundle: a gzip'd tar with a `data.json` and a `policy.rego`.
pub fn opa_bundle() -> Bytes {
    tar_gz_with_entries(&[
        ("data.json", b"{}"),
        ("policy.rego", b"package test\n\nallow := true\n"),
    ])
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn nupkg_contains_nuspec_entry() {
        let bytes = nupkg("Widgets", "1.0.0");
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(&bytes[..])).unwrap();
        assert!(archive.by_name("Widgets.nuspec").is_ok());
    }

    #[test]
    fn go_module_zip_nests_under_module_at_version() {
        let bytes = go_module_zip("example.com/foo", "v1.0.0");
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(&bytes[..])).unwrap();
        assert!(archive.by_name("example.com/foo@v1.0.0/go.mod").is_ok());
    }

    #[test]
    fn gem_contains_metadata_gz() {
        let bytes = gem("mygem", "1.2.3");
        let mut archive = tar::Archive::new(std::io::Cursor::new(&bytes[..]));
        let names: Vec<String> = archive
            .entries()
            .unwrap()
            .map(|e| e.unwrap().path().unwrap().to_string_lossy().into_owned())
            .collect();
        assert!(names.contains(&"metadata.gz".to_string()));
    }
}
