//! In-process providers and fixtures for tests.

use super::{Episode, MetadataProvider, MetadataRetrievalError, Provider, Show, ShowId};
use serde_json::json;
use std::cell::{Cell, RefCell};
use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::path::Path;
use std::thread::{self, JoinHandle};

/// Provider answering from canned data and counting its calls
pub(crate) struct FakeProvider {
    provider: Provider,
    shows: RefCell<Result<Vec<Show>, String>>,
    episodes: RefCell<Result<Vec<Episode>, String>>,
    pub search_calls: Cell<usize>,
    pub episode_calls: Cell<usize>,
}

impl FakeProvider {
    pub fn new(provider: Provider, shows: Vec<Show>, episodes: Vec<Episode>) -> Self {
        Self {
            provider,
            shows: RefCell::new(Ok(shows)),
            episodes: RefCell::new(Ok(episodes)),
            search_calls: Cell::new(0),
            episode_calls: Cell::new(0),
        }
    }

    /// A provider whose every call fails
    pub fn failing(provider: Provider) -> Self {
        let fake = Self::new(provider, Vec::new(), Vec::new());
        fake.fail();
        fake
    }

    pub fn fail(&self) {
        *self.shows.borrow_mut() = Err("offline".to_string());
        *self.episodes.borrow_mut() = Err("offline".to_string());
    }
}

impl MetadataProvider for FakeProvider {
    fn provider(&self) -> Provider {
        self.provider
    }

    fn search_shows(&self, _query: &str) -> Result<Vec<Show>, MetadataRetrievalError> {
        self.search_calls.set(self.search_calls.get() + 1);
        self.shows
            .borrow()
            .clone()
            .map_err(MetadataRetrievalError::RequestError)
    }

    fn fetch_episodes(&self, _show_id: u64) -> Result<Vec<Episode>, MetadataRetrievalError> {
        self.episode_calls.set(self.episode_calls.get() + 1);
        self.episodes
            .borrow()
            .clone()
            .map_err(MetadataRetrievalError::RequestError)
    }
}

pub(crate) fn show(provider: Provider, id: u64, name: &str) -> Show {
    Show {
        id: ShowId::new(provider, id),
        name: name.to_string(),
        display_name: name.to_string(),
        year: Some(1994),
        alternate_names: Vec::new(),
        raw: json!({ "id": id }),
    }
}

pub(crate) fn episode(season: u32, number: u32, name: &str) -> Episode {
    Episode {
        season_number: season,
        episode_number: number,
        name: name.to_string(),
        air_date: None,
        summary: String::new(),
        raw: json!({}),
    }
}

/// Serves one canned `(status, body)` response per connection, in order
///
/// Returns the base URL and a handle yielding the request lines received.
/// Every response must be requested, otherwise joining the handle blocks.
pub(crate) fn stub_server(responses: Vec<(u16, String)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().unwrap();
            requests.push(read_request_line(&stream));
            let response = format!(
                "HTTP/1.1 {} Stub\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            stream.write_all(response.as_bytes()).unwrap();
        }
        requests
    });

    (base_url, handle)
}

fn read_request_line(stream: &TcpStream) -> String {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();

    // Skip the headers; GET requests carry no body
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header).unwrap() == 0 || header == "\r\n" {
            break;
        }
    }

    request_line.trim_end().to_string()
}

/// Creates `dir` without write permission
///
/// Returns false when permissions are not enforced (e.g. running as root).
#[cfg(unix)]
pub(crate) fn read_only_dir(dir: &Path) -> bool {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fs::create_dir_all(dir).unwrap();
    fs::set_permissions(dir, fs::Permissions::from_mode(0o555)).unwrap();

    let check = dir.join(".write-check");
    if fs::write(&check, b"").is_ok() {
        fs::remove_file(&check).unwrap();
        return false;
    }
    true
}

#[cfg(unix)]
pub(crate) fn make_writable(dir: &Path) {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;

    fs::set_permissions(dir, fs::Permissions::from_mode(0o755)).unwrap();
}
