//! Fetches a left/right webcam image pair, for lining up a stereo rig.
//!
//! The pair is fetched once up front to check that both URLs work, and then
//! again every cycle. Failures during the loop are logged and the previous
//! good image of that side is kept. Blending and display are left to
//! whatever looks at the images.

use log::{debug, info, warn};
use std::{
    borrow::Cow,
    fmt,
    io::{self, Read},
    time::Duration,
};

/// Images larger than this are refused rather than read into memory.
const MAX_IMAGE_BYTES: u64 = 16 * 1024 * 1024;

/// Which camera an image belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// Left camera
    Left,
    /// Right camera
    Right,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Left => write!(f, "left"),
            Side::Right => write!(f, "right"),
        }
    }
}

/// Returned when an image could not be loaded.
#[derive(Debug)]
pub enum FetchError {
    /// The request failed, or the server answered with an error status.
    Http(Box<ureq::Error>),
    /// The body could not be read.
    IoError(io::Error),
    /// The server answered with something that is not an image.
    NotAnImage(String),
}

impl fmt::Display for FetchError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let msg = match self {
            FetchError::Http(error) => Cow::from(format!("http error: {}", error)),
            FetchError::IoError(error) => Cow::from(format!("io error: {}", error)),
            FetchError::NotAnImage(content_type) => {
                Cow::from(format!("not an image: {}", content_type))
            }
        };

        write!(f, "{}", msg)
    }
}

impl std::error::Error for FetchError {}

impl From<ureq::Error> for FetchError {
    fn from(value: ureq::Error) -> Self {
        Self::Http(Box::new(value))
    }
}

impl From<io::Error> for FetchError {
    fn from(value: io::Error) -> Self {
        Self::IoError(value)
    }
}

/// Somewhere images can be loaded from by URL.
pub trait ImageSource {
    /// Load the raw (still encoded) image at `url`.
    fn fetch(&mut self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Loads images over plain HTTP.
pub struct HttpSource {
    agent: ureq::Agent,
}

impl HttpSource {
    /// A source that gives up on any single image after `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            agent: ureq::AgentBuilder::new().timeout(timeout).build(),
        }
    }
}

impl ImageSource for HttpSource {
    fn fetch(&mut self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self.agent.get(url).call()?;
        let content_type = response.content_type().to_owned();
        if !content_type.starts_with("image/") {
            return Err(FetchError::NotAnImage(content_type));
        }

        let mut bytes = Vec::new();
        response
            .into_reader()
            .take(MAX_IMAGE_BYTES)
            .read_to_end(&mut bytes)?;
        Ok(bytes)
    }
}

/// The most recent good image from each camera.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StereoPair {
    /// Left image, still encoded
    pub left: Option<Vec<u8>>,
    /// Right image, still encoded
    pub right: Option<Vec<u8>>,
}

/// Keeps fetching the same two URLs.
pub struct AlignPoller<S: ImageSource> {
    source: S,
    left_url: String,
    right_url: String,
    latest: StereoPair,
}

impl<S: ImageSource> AlignPoller<S> {
    /// Poll `left_url` and `right_url` through `source`.
    pub fn new(source: S, left_url: String, right_url: String) -> Self {
        Self {
            source,
            left_url,
            right_url,
            latest: StereoPair::default(),
        }
    }

    /// The last good pair.
    pub fn latest(&self) -> &StereoPair {
        &self.latest
    }

    /// Try both URLs once. Fails on the first side that does not load.
    pub fn check(&mut self) -> Result<(), (Side, FetchError)> {
        for side in [Side::Left, Side::Right] {
            info!("Testing {} image load.", side);
            let image = self.fetch_side(side).map_err(|e| (side, e))?;
            info!("  Load successful ({} bytes).", image.len());
            self.store(side, image);
        }
        Ok(())
    }

    /// Fetch both images. A side that fails keeps its previous image.
    /// Returns how many sides loaded.
    pub fn poll(&mut self) -> usize {
        let mut loaded = 0;
        for side in [Side::Left, Side::Right] {
            match self.fetch_side(side) {
                Ok(image) => {
                    debug!("Loaded {} image, {} bytes", side, image.len());
                    self.store(side, image);
                    loaded += 1;
                }
                Err(e) => warn!("Error loading {} image: {}", side, e),
            }
        }
        loaded
    }

    fn fetch_side(&mut self, side: Side) -> Result<Vec<u8>, FetchError> {
        let url = match side {
            Side::Left => &self.left_url,
            Side::Right => &self.right_url,
        };
        self.source.fetch(url)
    }

    fn store(&mut self, side: Side, image: Vec<u8>) {
        match side {
            Side::Left => self.latest.left = Some(image),
            Side::Right => self.latest.right = Some(image),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    /// Serves canned images, or a 404-ish error for anything else.
    #[derive(Default)]
    struct CannedSource {
        images: HashMap<String, Vec<u8>>,
        requests: Vec<String>,
    }

    impl ImageSource for CannedSource {
        fn fetch(&mut self, url: &str) -> Result<Vec<u8>, FetchError> {
            self.requests.push(url.to_owned());
            self.images
                .get(url)
                .cloned()
                .ok_or_else(|| FetchError::NotAnImage("text/html".to_owned()))
        }
    }

    fn poller(images: &[(&str, &[u8])]) -> AlignPoller<CannedSource> {
        let source = CannedSource {
            images: images
                .iter()
                .map(|(url, bytes)| (url.to_string(), bytes.to_vec()))
                .collect(),
            requests: vec![],
        };
        AlignPoller::new(source, "http://l/img".to_owned(), "http://r/img".to_owned())
    }

    #[test]
    fn check_loads_both_sides() {
        let mut poller = poller(&[("http://l/img", &b"GIF89a-l"[..]), ("http://r/img", &b"GIF89a-r"[..])]);
        poller.check().unwrap();
        assert_eq!(poller.latest().left.as_deref(), Some(&b"GIF89a-l"[..]));
        assert_eq!(poller.latest().right.as_deref(), Some(&b"GIF89a-r"[..]));
    }

    #[test]
    fn check_names_the_failing_side() {
        let mut poller = poller(&[("http://l/img", &b"GIF89a-l"[..])]);
        match poller.check() {
            Err((Side::Right, FetchError::NotAnImage(ct))) => assert_eq!(ct, "text/html"),
            other => panic!("expected the right side to fail, got {:?}", other),
        }
    }

    #[test]
    fn poll_keeps_last_good_image() {
        let mut poller = poller(&[("http://l/img", &b"one"[..]), ("http://r/img", &b"two"[..])]);
        assert_eq!(poller.poll(), 2);

        poller.source.images.remove("http://r/img");
        poller.source.images.insert("http://l/img".to_owned(), b"three".to_vec());
        assert_eq!(poller.poll(), 1);

        assert_eq!(poller.latest().left.as_deref(), Some(&b"three"[..]));
        assert_eq!(poller.latest().right.as_deref(), Some(&b"two"[..]));
        assert_eq!(poller.source.requests.len(), 4);
    }

    #[test]
    fn fetch_errors_display() {
        assert_eq!(
            FetchError::NotAnImage("text/plain".to_owned()).to_string(),
            "not an image: text/plain"
        );
        assert_eq!(Side::Left.to_string(), "left");
    }
}
