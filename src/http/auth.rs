//! Authentication challenges, the codec that answers them, and the per-user
//! bid bookkeeping that bounds retries.

use std::collections::HashMap;

use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use http::Method;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use md5::Md5;
use sha2::{Digest, Sha256};

use crate::error::AuthError;

/// Which side of the exchange issued the challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RealmClass {
    Www,
    Proxy,
}

impl RealmClass {
    #[must_use]
    pub const fn from_status(status: u16) -> Option<Self> {
        match status {
            401 => Some(RealmClass::Www),
            407 => Some(RealmClass::Proxy),
            _ => None,
        }
    }

    #[must_use]
    pub const fn challenge_header(self) -> &'static str {
        match self {
            RealmClass::Www => "www-authenticate",
            RealmClass::Proxy => "proxy-authenticate",
        }
    }

    #[must_use]
    pub const fn request_header(self) -> &'static str {
        match self {
            RealmClass::Www => "Authorization",
            RealmClass::Proxy => "Proxy-Authorization",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
    /// Restricts the credentials to one realm; `None` answers any realm.
    pub realm: Option<String>,
}

impl Credentials {
    #[must_use]
    pub fn matches(&self, realm: &str) -> bool {
        self.realm.as_deref().is_none_or(|own| own == realm)
    }
}

/// A parsed `WWW-Authenticate` / `Proxy-Authenticate` value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Challenge {
    pub scheme: String,
    pub params: Vec<(String, String)>,
}

impl Challenge {
    /// Parses `Scheme key=value, key="quoted value"`.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        let value = value.trim();
        let (scheme, rest) = value
            .split_once(char::is_whitespace)
            .unwrap_or((value, ""));
        if scheme.is_empty() {
            return None;
        }
        Some(Self {
            scheme: scheme.to_owned(),
            params: parse_params(rest),
        })
    }

    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    #[must_use]
    pub fn realm(&self) -> &str {
        self.param("realm").unwrap_or_default()
    }

    #[must_use]
    pub fn is_scheme(&self, scheme: &str) -> bool {
        self.scheme.eq_ignore_ascii_case(scheme)
    }
}

fn parse_params(input: &str) -> Vec<(String, String)> {
    let mut params = Vec::new();
    let mut chars = input.chars().peekable();
    loop {
        while chars.next_if(|ch| ch.is_whitespace() || *ch == ',').is_some() {}
        let mut key = String::new();
        while let Some(ch) = chars.next_if(|ch| *ch != '=' && *ch != ',') {
            key.push(ch);
        }
        if key.trim().is_empty() {
            return params;
        }
        let mut value = String::new();
        if chars.next_if_eq(&'=').is_some() {
            while chars.next_if(|ch| ch.is_whitespace()).is_some() {}
            if chars.next_if_eq(&'"').is_some() {
                while let Some(ch) = chars.next() {
                    match ch {
                        '"' => break,
                        '\\' => {
                            if let Some(escaped) = chars.next() {
                                value.push(escaped);
                            }
                        }
                        other => value.push(other),
                    }
                }
            } else {
                while let Some(ch) = chars.next_if(|ch| *ch != ',') {
                    value.push(ch);
                }
            }
        }
        params.push((key.trim().to_owned(), value.trim().to_owned()));
    }
}

/// Produces the credential header value answering a challenge. Codecs may
/// keep state between calls, e.g. a Digest nonce count.
pub trait AuthCodec: Send {
    /// # Errors
    ///
    /// Returns `AuthError::Unsupported` for schemes the codec cannot answer
    /// and `AuthError::MissingParam` for incomplete challenges.
    fn compute(
        &mut self,
        challenge: &Challenge,
        credentials: &Credentials,
        method: &Method,
        uri: &str,
    ) -> Result<String, AuthError>;
}

/// Basic plus Digest over MD5 and SHA-256, with their `-sess` variants.
/// NTLM and `auth-int` are not available.
pub struct StandardAuthCodec {
    nonce: Option<String>,
    nonce_count: u32,
    rng: StdRng,
}

impl StandardAuthCodec {
    #[must_use]
    pub fn new(seed: u64) -> Self {
        Self {
            nonce: None,
            nonce_count: 0,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    fn next_nonce_count(&mut self, nonce: &str) -> u32 {
        if self.nonce.as_deref() == Some(nonce) {
            self.nonce_count = self.nonce_count.saturating_add(1);
        } else {
            self.nonce = Some(nonce.to_owned());
            self.nonce_count = 1;
        }
        self.nonce_count
    }

    fn cnonce(&mut self) -> String {
        let mut bytes = [0u8; 16];
        self.rng.fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    fn digest(
        &mut self,
        challenge: &Challenge,
        credentials: &Credentials,
        method: &Method,
        uri: &str,
    ) -> Result<String, AuthError> {
        let algorithm = challenge.param("algorithm").unwrap_or("MD5");
        let (hash, sess) = match algorithm.to_ascii_uppercase().as_str() {
            "MD5" => (DigestHash::Md5, false),
            "MD5-SESS" => (DigestHash::Md5, true),
            "SHA-256" => (DigestHash::Sha256, false),
            "SHA-256-SESS" => (DigestHash::Sha256, true),
            _ => {
                return Err(AuthError::Unsupported {
                    scheme: format!("Digest {}", algorithm),
                });
            }
        };
        let nonce = challenge
            .param("nonce")
            .ok_or(AuthError::MissingParam { param: "nonce" })?;
        let qop = match challenge.param("qop") {
            None => None,
            Some(offered) if offered.split(',').any(|qop| qop.trim() == "auth") => Some("auth"),
            Some(offered) => {
                return Err(AuthError::Unsupported {
                    scheme: format!("Digest qop={}", offered),
                });
            }
        };
        let nc = self.next_nonce_count(nonce);
        let cnonce = self.cnonce();
        let response = digest_response(&DigestInput {
            user: &credentials.user,
            password: &credentials.password,
            realm: challenge.realm(),
            nonce,
            cnonce: &cnonce,
            nc,
            qop,
            method: method.as_str(),
            uri,
            hash,
            sess,
        });

        let mut header = format!(
            "Digest username=\"{}\", realm=\"{}\", nonce=\"{}\", uri=\"{}\", algorithm={}, response=\"{}\"",
            credentials.user,
            challenge.realm(),
            nonce,
            uri,
            algorithm,
            response
        );
        if let Some(qop) = qop {
            header.push_str(&format!(", qop={}, nc={:08x}, cnonce=\"{}\"", qop, nc, cnonce));
        }
        if let Some(opaque) = challenge.param("opaque") {
            header.push_str(&format!(", opaque=\"{}\"", opaque));
        }
        Ok(header)
    }
}

impl AuthCodec for StandardAuthCodec {
    fn compute(
        &mut self,
        challenge: &Challenge,
        credentials: &Credentials,
        method: &Method,
        uri: &str,
    ) -> Result<String, AuthError> {
        if challenge.is_scheme("basic") {
            let token = B64.encode(format!("{}:{}", credentials.user, credentials.password));
            return Ok(format!("Basic {}", token));
        }
        if challenge.is_scheme("digest") {
            return self.digest(challenge, credentials, method, uri);
        }
        Err(AuthError::Unsupported {
            scheme: challenge.scheme.clone(),
        })
    }
}

pub(crate) struct DigestInput<'input> {
    pub user: &'input str,
    pub password: &'input str,
    pub realm: &'input str,
    pub nonce: &'input str,
    pub cnonce: &'input str,
    pub nc: u32,
    pub qop: Option<&'input str>,
    pub method: &'input str,
    pub uri: &'input str,
    pub hash: DigestHash,
    pub sess: bool,
}

/// Hash family named by a Digest challenge's `algorithm` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DigestHash {
    Md5,
    Sha256,
}

impl DigestHash {
    fn hex(self, input: &str) -> String {
        match self {
            DigestHash::Md5 => hex::encode(Md5::digest(input.as_bytes())),
            DigestHash::Sha256 => hex::encode(Sha256::digest(input.as_bytes())),
        }
    }
}

/// `response` value per RFC 2617 (MD5) and RFC 7616 (SHA-256).
pub(crate) fn digest_response(input: &DigestInput<'_>) -> String {
    let hash = input.hash;
    let mut ha1 = hash.hex(&format!("{}:{}:{}", input.user, input.realm, input.password));
    if input.sess {
        ha1 = hash.hex(&format!("{}:{}:{}", ha1, input.nonce, input.cnonce));
    }
    let ha2 = hash.hex(&format!("{}:{}", input.method, input.uri));
    match input.qop {
        Some(qop) => hash.hex(&format!(
            "{}:{}:{:08x}:{}:{}:{}",
            ha1, input.nonce, input.nc, input.cnonce, qop, ha2
        )),
        None => hash.hex(&format!("{}:{}:{}", ha1, input.nonce, ha2)),
    }
}

/// Per-user authentication state.
///
/// Each logical transaction starts with fresh bid counters. A challenge that
/// was answered stays active, so later transactions authenticate up front.
pub struct AuthTracker {
    codec: Box<dyn AuthCodec>,
    credentials: Vec<Credentials>,
    proxy_credentials: Option<Credentials>,
    bids: u32,
    attempts: HashMap<(RealmClass, String), u32>,
    active: HashMap<RealmClass, Challenge>,
}

impl AuthTracker {
    #[must_use]
    pub fn new(
        codec: Box<dyn AuthCodec>,
        credentials: Vec<Credentials>,
        proxy_credentials: Option<Credentials>,
        bids: u32,
    ) -> Self {
        Self {
            codec,
            credentials,
            proxy_credentials,
            bids: bids.max(1),
            attempts: HashMap::new(),
            active: HashMap::new(),
        }
    }

    pub fn begin_transaction(&mut self) {
        self.attempts.clear();
    }

    #[must_use]
    pub fn attempts(&self, class: RealmClass, realm: &str) -> u32 {
        self.attempts
            .get(&(class, realm.to_owned()))
            .copied()
            .unwrap_or(0)
    }

    fn credentials_for(&self, class: RealmClass, realm: &str) -> Option<&Credentials> {
        match class {
            RealmClass::Www => self.credentials.iter().find(|creds| creds.matches(realm)),
            RealmClass::Proxy => self.proxy_credentials.as_ref(),
        }
    }

    /// Records a 401/407 and decides whether another attempt is allowed.
    /// `challenges` are the raw authenticate header values.
    ///
    /// # Errors
    ///
    /// `BidsExhausted` once the realm has used its bids, `MissingChallenge`
    /// when the server sent none, `MissingCredentials` when nothing answers
    /// the realm.
    pub fn respond<'value>(
        &mut self,
        class: RealmClass,
        status: u16,
        challenges: impl Iterator<Item = &'value str>,
    ) -> Result<(), AuthError> {
        let parsed: Vec<Challenge> = challenges.filter_map(Challenge::parse).collect();
        let challenge = parsed
            .iter()
            .find(|challenge| challenge.is_scheme("digest"))
            .or_else(|| parsed.iter().find(|challenge| challenge.is_scheme("basic")))
            .or_else(|| parsed.first())
            .cloned()
            .ok_or(AuthError::MissingChallenge { status })?;

        let realm = challenge.realm().to_owned();
        let count = self.attempts.entry((class, realm.clone())).or_insert(0);
        *count = count.saturating_add(1);
        if *count >= self.bids {
            self.active.remove(&class);
            return Err(AuthError::BidsExhausted {
                realm,
                bids: self.bids,
            });
        }
        if self.credentials_for(class, &realm).is_none() {
            return Err(AuthError::MissingCredentials { realm });
        }
        self.active.insert(class, challenge);
        Ok(())
    }

    /// Header answering the active challenge of `class`, if any. A challenge
    /// the codec cannot answer is dropped, so later transactions go out
    /// without credentials again.
    ///
    /// # Errors
    ///
    /// `Unanswerable` naming the realm when the codec fails.
    pub fn header(
        &mut self,
        class: RealmClass,
        method: &Method,
        uri: &str,
    ) -> Result<Option<(&'static str, String)>, AuthError> {
        let Some(challenge) = self.active.get(&class) else {
            return Ok(None);
        };
        let realm = challenge.realm();
        let credentials = match class {
            RealmClass::Www => self.credentials.iter().find(|creds| creds.matches(realm)),
            RealmClass::Proxy => self.proxy_credentials.as_ref(),
        }
        .ok_or_else(|| AuthError::MissingCredentials {
            realm: realm.to_owned(),
        })?;
        match self.codec.compute(challenge, credentials, method, uri) {
            Ok(value) => Ok(Some((class.request_header(), value))),
            Err(source) => {
                let realm = realm.to_owned();
                self.active.remove(&class);
                Err(AuthError::Unanswerable {
                    realm,
                    source: Box::new(source),
                })
            }
        }
    }
}
