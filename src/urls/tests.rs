use super::*;
use std::io::Write;

#[test]
fn bare_host_defaults_to_http() -> Result<(), String> {
    let entry = UrlEntry::get("example.com/index.html").map_err(|err| err.to_string())?;
    if entry.url.as_str() != "http://example.com/index.html" {
        return Err(format!("Unexpected URL: {}", entry.url));
    }
    if entry.port() != 80 || entry.scheme() != Scheme::Http {
        return Err(format!("Unexpected port {}", entry.port()));
    }
    Ok(())
}

#[test]
fn unsupported_scheme_is_rejected() -> Result<(), String> {
    match normalize("gopher://example.com/") {
        Err(UrlError::UnsupportedScheme { scheme, .. }) if scheme == "gopher" => Ok(()),
        Err(other) => Err(format!("Unexpected error: {}", other)),
        Ok(url) => Err(format!("Expected rejection, got {}", url)),
    }
}

#[test]
fn line_with_method_and_inline_body() -> Result<(), String> {
    let entry = parse_line("http://localhost:8080/login POST user=a&pass=b", 1)
        .map_err(|err| err.to_string())?
        .ok_or_else(|| "Expected an entry".to_owned())?;
    if entry.method != Method::POST {
        return Err(format!("Unexpected method {}", entry.method));
    }
    if entry.body.as_deref() != Some(b"user=a&pass=b".as_slice()) {
        return Err("Unexpected body".to_owned());
    }
    if entry.host_header() != "localhost:8080" || entry.path_and_query() != "/login" {
        return Err(format!("Unexpected target {}", entry.host_header()));
    }
    Ok(())
}

#[test]
fn comments_and_blank_lines_are_skipped() -> Result<(), String> {
    for line in ["", "   ", "# http://ignored/"] {
        if parse_line(line, 1).map_err(|err| err.to_string())?.is_some() {
            return Err(format!("Line {:?} should be skipped", line));
        }
    }
    Ok(())
}

#[test]
fn unknown_method_names_the_line() -> Result<(), String> {
    match parse_line("http://localhost/ TRACE", 7) {
        Err(UrlError::UnsupportedMethod { line: 7, .. }) => Ok(()),
        Err(other) => Err(format!("Unexpected error: {}", other)),
        Ok(_) => Err("Expected UnsupportedMethod".to_owned()),
    }
}

#[test]
fn load_file_reads_body_files() -> Result<(), String> {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let body_path = dir.path().join("body.json");
    std::fs::write(&body_path, b"{\"k\":1}").map_err(|err| err.to_string())?;

    let list_path = dir.path().join("urls.txt");
    let mut file = std::fs::File::create(&list_path).map_err(|err| err.to_string())?;
    writeln!(file, "# targets").map_err(|err| err.to_string())?;
    writeln!(file, "http://localhost/").map_err(|err| err.to_string())?;
    writeln!(file, "http://localhost/api PUT <{}", body_path.display())
        .map_err(|err| err.to_string())?;
    writeln!(file, "ftp://user:pw@localhost/pub/file.bin").map_err(|err| err.to_string())?;
    drop(file);

    let entries = load_file(&list_path).map_err(|err| err.to_string())?;
    if entries.len() != 3 {
        return Err(format!("Expected 3 entries, got {}", entries.len()));
    }
    let put = entries.get(1).ok_or_else(|| "missing PUT entry".to_owned())?;
    if put.method != Method::PUT || put.body.as_deref() != Some(b"{\"k\":1}".as_slice()) {
        return Err("PUT body not loaded from file".to_owned());
    }
    let ftp = entries.get(2).ok_or_else(|| "missing FTP entry".to_owned())?;
    if ftp.scheme() != Scheme::Ftp || ftp.port() != 21 {
        return Err("FTP entry not recognised".to_owned());
    }
    Ok(())
}

#[test]
fn empty_file_is_an_error() -> Result<(), String> {
    let dir = tempfile::tempdir().map_err(|err| err.to_string())?;
    let path = dir.path().join("urls.txt");
    std::fs::write(&path, "# nothing\n\n").map_err(|err| err.to_string())?;
    match load_file(&path) {
        Err(UrlError::EmptyFile { .. }) => Ok(()),
        Err(other) => Err(format!("Unexpected error: {}", other)),
        Ok(entries) => Err(format!("Expected error, got {} entries", entries.len())),
    }
}
