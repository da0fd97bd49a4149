use std::collections::HashSet;
use std::fmt;

use rand::Rng;

/// Serial reserved for the manifest blob on the content store.
pub const ROOT_SERIAL: &str = "ROOT";

/// Bounds on the length of a generated or accepted serial.
pub const MIN_SERIAL_LEN: usize = 128;
pub const MAX_SERIAL_LEN: usize = 4096;

const SERIAL_HEAD: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz_";
const SERIAL_TAIL: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_";

/// Does `serial` match the content store's serial grammar?
///
/// Either the reserved [`ROOT_SERIAL`], or an identifier of
///  128..=4096 characters drawn from `[A-Za-z_][A-Za-z0-9_]*`.
pub fn is_valid_serial(serial: &str) -> bool {
    if serial == ROOT_SERIAL {
        return true;
    }
    let bytes = serial.as_bytes();
    if bytes.len() < MIN_SERIAL_LEN || bytes.len() > MAX_SERIAL_LEN {
        return false;
    }
    SERIAL_HEAD.contains(&bytes[0]) && bytes[1..].iter().all(|b| SERIAL_TAIL.contains(b))
}

/// Draw a random serial of 129..=4096 characters.
pub fn random_serial() -> String {
    let mut rng = rand::rng();
    let len = rng.random_range(MIN_SERIAL_LEN + 1..=MAX_SERIAL_LEN);
    let mut serial = String::with_capacity(len);
    serial.push(SERIAL_HEAD[rng.random_range(0..SERIAL_HEAD.len())] as char);
    for _ in 1..len {
        serial.push(SERIAL_TAIL[rng.random_range(0..SERIAL_TAIL.len())] as char);
    }
    serial
}

type Generator = Box<dyn FnMut() -> String + Send>;

/// Issues serials that are never handed out twice.
///
/// Every value returned by [`SerialSource::next_serial`] is remembered in
///  `issued`; serials known to exist elsewhere (e.g. on the content store
///  after a recovery) can be registered with [`SerialSource::recover`]
///  so they are never issued either.
pub struct SerialSource {
    issued: HashSet<String>,
    generator: Generator,
}

impl fmt::Debug for SerialSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SerialSource")
            .field("issued", &self.issued.len())
            .finish()
    }
}

impl Default for SerialSource {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialSource {
    pub fn new() -> Self {
        Self::with_generator(random_serial)
    }

    /// Use a custom generator. It is sampled until it yields a value
    ///  that has not been issued yet.
    pub fn with_generator<G>(generator: G) -> Self
    where
        G: FnMut() -> String + Send + 'static,
    {
        Self {
            issued: HashSet::new(),
            generator: Box::new(generator),
        }
    }

    pub fn next_serial(&mut self) -> String {
        self.next_serial_avoiding(|_| false)
    }

    /// Like [`SerialSource::next_serial`], but also resamples while `taken`
    ///  reports the candidate as in use somewhere this source cannot see.
    pub fn next_serial_avoiding<F>(&mut self, taken: F) -> String
    where
        F: Fn(&str) -> bool,
    {
        loop {
            let candidate = (self.generator)();
            if !self.issued.contains(&candidate) && !taken(&candidate) {
                self.issued.insert(candidate.clone());
                return candidate;
            }
            tracing::trace!("serial collision, resampling");
        }
    }

    /// Return a serial to the pool. Only for serials that were issued but
    ///  never ended up attached to a file.
    pub fn release(&mut self, serial: &str) {
        self.issued.remove(serial);
    }

    /// Mark every serial in `known` as issued without returning it.
    pub fn recover<I, S>(&mut self, known: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.issued.extend(known.into_iter().map(Into::into));
    }

    pub fn contains(&self, serial: &str) -> bool {
        self.issued.contains(serial)
    }

    pub fn len(&self) -> usize {
        self.issued.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issued.is_empty()
    }

    /// Forget every issued serial.
    pub fn reset(&mut self) {
        self.issued.clear();
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_random_serial_is_valid() {
        for _ in 0..16 {
            let serial = random_serial();
            assert!(serial.len() > MIN_SERIAL_LEN);
            assert!(serial.len() <= MAX_SERIAL_LEN);
            assert!(is_valid_serial(&serial));
        }
    }

    #[test]
    fn test_serial_grammar() {
        assert!(is_valid_serial(ROOT_SERIAL));
        assert!(is_valid_serial(&"a".repeat(128)));
        assert!(is_valid_serial(&format!("_{}", "9".repeat(4095))));

        assert!(!is_valid_serial(&"a".repeat(127)));
        assert!(!is_valid_serial(&"a".repeat(4097)));
        assert!(!is_valid_serial(&format!("9{}", "a".repeat(200))));
        assert!(!is_valid_serial(&format!("a-{}", "a".repeat(200))));
        assert!(!is_valid_serial("root"));
    }

    #[test]
    fn test_next_serial_resamples_on_collision() {
        let mut samples = vec!["c", "b", "b", "a", "a"];
        let mut source = SerialSource::with_generator(move || samples.pop().unwrap().to_string());
        assert_eq!(source.next_serial(), "a");
        assert_eq!(source.next_serial(), "b");
        assert_eq!(source.next_serial(), "c");
        assert_eq!(source.len(), 3);
    }

    #[test]
    fn test_recover_blocks_known_serials() {
        let mut samples = vec!["fresh", "known"];
        let mut source = SerialSource::with_generator(move || samples.pop().unwrap().to_string());
        source.recover(["known"]);
        assert!(source.contains("known"));
        assert_eq!(source.next_serial(), "fresh");
    }

    #[test]
    fn test_next_serial_avoiding_skips_taken() {
        let mut samples = vec!["free", "remote", "issued"];
        let mut source = SerialSource::with_generator(move || samples.pop().unwrap().to_string());
        source.recover(["issued"]);
        assert_eq!(source.next_serial_avoiding(|s| s == "remote"), "free");
        assert!(source.contains("free"));

        source.release("free");
        assert!(!source.contains("free"));
        assert!(source.contains("issued"));
    }

    #[test]
    fn test_reset_forgets_issued() {
        let mut source = SerialSource::new();
        let serial = source.next_serial();
        assert!(source.contains(&serial));
        source.reset();
        assert!(source.is_empty());
    }
}
