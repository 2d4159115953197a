use std::collections::{BTreeMap, BTreeSet};
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

const STAMP: &str = "08-15-20  02:30PM";

#[derive(Default)]
struct FtpState {
    dirs: BTreeSet<String>,
    files: BTreeMap<String, Vec<u8>>,
    commands: Vec<String>,
    sessions: usize,
    list_delay: Duration,
}

/// A small in-memory FTP server speaking just enough of the protocol for
/// the client: login, passive data connections and the DOS-style `LIST`
/// format IIS produces.
#[derive(Clone)]
pub struct FakeFtpServer {
    addr: SocketAddr,
    state: Arc<Mutex<FtpState>>,
}

impl FakeFtpServer {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut state = FtpState::default();
        state.dirs.insert("/".to_string());
        let state = Arc::new(Mutex::new(state));

        let shared = Arc::clone(&state);
        thread::spawn(move || {
            for stream in listener.incoming().flatten() {
                let state = Arc::clone(&shared);
                thread::spawn(move || {
                    let _ = session(stream, &state);
                });
            }
        });

        Self { addr, state }
    }

    pub fn url(&self, path: &str) -> String {
        format!("ftp://{}{}", self.addr, path)
    }

    pub fn add_dir(&self, path: &str) {
        self.state.lock().unwrap().dirs.insert(path.to_string());
    }

    pub fn add_file(&self, path: &str, content: &[u8]) {
        self.state
            .lock()
            .unwrap()
            .files
            .insert(path.to_string(), content.to_vec());
    }

    pub fn file(&self, path: &str) -> Option<Vec<u8>> {
        self.state.lock().unwrap().files.get(path).cloned()
    }

    pub fn has_dir(&self, path: &str) -> bool {
        self.state.lock().unwrap().dirs.contains(path)
    }

    pub fn commands(&self) -> Vec<String> {
        self.state.lock().unwrap().commands.clone()
    }

    /// Makes every `LIST` wait before answering.
    pub fn set_list_delay(&self, delay: Duration) {
        self.state.lock().unwrap().list_delay = delay;
    }

    /// Number of control connections that logged in.
    pub fn sessions(&self) -> usize {
        self.state.lock().unwrap().sessions
    }
}

fn normalize(path: &str) -> String {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

fn parent(path: &str) -> String {
    match path.rfind('/') {
        Some(0) | None => "/".to_string(),
        Some(i) => path[..i].to_string(),
    }
}

fn name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn reply(writer: &mut TcpStream, line: &str) -> io::Result<()> {
    writer.write_all(format!("{line}\r\n").as_bytes())
}

fn accept(passive: &mut Option<TcpListener>) -> io::Result<TcpStream> {
    let listener = passive
        .take()
        .ok_or_else(|| io::Error::new(io::ErrorKind::Other, "no PASV before transfer"))?;
    Ok(listener.accept()?.0)
}

fn listing(state: &FtpState, dir: &str) -> Option<String> {
    if !state.dirs.contains(dir) {
        return None;
    }
    let mut out = String::new();
    for d in state.dirs.iter().filter(|d| *d != "/" && parent(d) == dir) {
        out.push_str(&format!("{STAMP}       <DIR>          {}\r\n", name(d)));
    }
    for (f, content) in state.files.iter().filter(|(f, _)| parent(f) == dir) {
        out.push_str(&format!("{STAMP}       {:>14} {}\r\n", content.len(), name(f)));
    }
    Some(out)
}

fn session(stream: TcpStream, state: &Mutex<FtpState>) -> io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut writer = stream;
    let mut passive: Option<TcpListener> = None;
    let mut rename_from: Option<String> = None;

    reply(&mut writer, "220 fake ftp ready")?;

    let mut line = String::new();
    loop {
        line.clear();
        if reader.read_line(&mut line)? == 0 {
            return Ok(());
        }
        let line = line.trim_end();
        let (cmd, arg) = line.split_once(' ').unwrap_or((line, ""));
        let cmd = cmd.to_ascii_uppercase();
        state.lock().unwrap().commands.push(cmd.clone());

        match cmd.as_str() {
            "USER" => reply(&mut writer, "331 password please")?,
            "PASS" => {
                state.lock().unwrap().sessions += 1;
                reply(&mut writer, "230 logged in")?;
            }
            "TYPE" | "NOOP" => reply(&mut writer, "200 ok")?,
            "PASV" => {
                let listener = TcpListener::bind("127.0.0.1:0")?;
                let port = listener.local_addr()?.port();
                passive = Some(listener);
                reply(
                    &mut writer,
                    &format!("227 Entering Passive Mode (127,0,0,1,{},{})", port >> 8, port & 0xff),
                )?;
            }
            "LIST" => {
                let delay = state.lock().unwrap().list_delay;
                thread::sleep(delay);
                let body = listing(&state.lock().unwrap(), &normalize(arg));
                match body {
                    Some(body) => {
                        reply(&mut writer, "150 listing")?;
                        accept(&mut passive)?.write_all(body.as_bytes())?;
                        reply(&mut writer, "226 done")?;
                    }
                    None => reply(&mut writer, "550 no such directory")?,
                }
            }
            "RETR" => {
                let content = state.lock().unwrap().files.get(&normalize(arg)).cloned();
                match content {
                    Some(content) => {
                        reply(&mut writer, "150 sending")?;
                        accept(&mut passive)?.write_all(&content)?;
                        reply(&mut writer, "226 done")?;
                    }
                    None => reply(&mut writer, "550 no such file")?,
                }
            }
            "STOR" => {
                let path = normalize(arg);
                if !state.lock().unwrap().dirs.contains(&parent(&path)) {
                    reply(&mut writer, "550 no such directory")?;
                    continue;
                }
                reply(&mut writer, "150 ready")?;
                let mut content = Vec::new();
                accept(&mut passive)?.read_to_end(&mut content)?;
                state.lock().unwrap().files.insert(path, content);
                reply(&mut writer, "226 stored")?;
            }
            "MKD" => {
                let path = normalize(arg);
                let mut state = state.lock().unwrap();
                if state.dirs.contains(&path) || !state.dirs.contains(&parent(&path)) {
                    drop(state);
                    reply(&mut writer, "550 cannot create directory")?;
                } else {
                    state.dirs.insert(path.clone());
                    drop(state);
                    reply(&mut writer, &format!("257 \"{path}\" created"))?;
                }
            }
            "RMD" => {
                let path = normalize(arg);
                let removed = state.lock().unwrap().dirs.remove(&path);
                reply(&mut writer, if removed { "250 removed" } else { "550 no such directory" })?;
            }
            "DELE" => {
                let removed = state.lock().unwrap().files.remove(&normalize(arg)).is_some();
                reply(&mut writer, if removed { "250 deleted" } else { "550 no such file" })?;
            }
            "RNFR" => {
                let path = normalize(arg);
                if state.lock().unwrap().files.contains_key(&path) {
                    rename_from = Some(path);
                    reply(&mut writer, "350 ready for RNTO")?;
                } else {
                    reply(&mut writer, "550 no such file")?;
                }
            }
            "RNTO" => match rename_from.take() {
                Some(from) => {
                    let to = if arg.starts_with('/') {
                        normalize(arg)
                    } else {
                        format!("{}/{}", parent(&from).trim_end_matches('/'), arg)
                    };
                    let mut state = state.lock().unwrap();
                    if let Some(content) = state.files.remove(&from) {
                        state.files.insert(to, content);
                    }
                    drop(state);
                    reply(&mut writer, "250 renamed")?;
                }
                None => reply(&mut writer, "503 RNFR first")?,
            },
            "QUIT" => {
                reply(&mut writer, "221 bye")?;
                return Ok(());
            }
            _ => reply(&mut writer, "502 not implemented")?,
        }
    }
}
