use rand::Rng;

const DEVICE_ID_PREFIX: &str = "dev-";
const DEVICE_ID_LEN: usize = 8;
const BASE36: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";

/// Trait for generating device identifiers
pub trait DeviceIdGenerator: Send + Sync {
    fn generate(&self) -> String;
}

/// Random `dev-xxxxxxxx` identifiers in lowercase base 36
pub struct RandomDeviceIdGenerator;

impl RandomDeviceIdGenerator {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RandomDeviceIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl DeviceIdGenerator for RandomDeviceIdGenerator {
    fn generate(&self) -> String {
        let mut rng = rand::rng();
        let suffix: String = (0..DEVICE_ID_LEN)
            .map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
            .collect();
        format!("{DEVICE_ID_PREFIX}{suffix}")
    }
}
