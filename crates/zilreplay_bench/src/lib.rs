//! Benchmark utilities.

use rand::distributions::Alphanumeric;
use rand::Rng;
use zilreplay_store::ROOT_OBJECT_ID;
use zilreplay_testkit::builders;

/// First object id handed out by [`create_log`].
pub const FIRST_CREATED_ID: u64 = 1_000;

/// Generate random data of the specified size.
pub fn random_data(size: usize) -> Vec<u8> {
    let mut rng = rand::thread_rng();
    (0..size).map(|_| rng.gen()).collect()
}

/// Generate a random alphanumeric entry name.
pub fn random_name(len: usize) -> Vec<u8> {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .collect()
}

/// Generate `count` write records of `payload_size` random bytes each, all
/// aimed at `object`.
pub fn write_log(object: u64, count: usize, payload_size: usize) -> Vec<Vec<u8>> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|_| {
            let offset = rng.gen_range(0..1u64 << 20);
            builders::write(object, offset, &random_data(payload_size)).build()
        })
        .collect()
}

/// Generate a log that creates `count` files in the root directory, each
/// followed by one write of `payload_size` bytes.
pub fn create_log(count: usize, payload_size: usize) -> Vec<Vec<u8>> {
    let root = ROOT_OBJECT_ID.as_u64();
    (0..count as u64)
        .flat_map(|i| {
            let id = FIRST_CREATED_ID + i;
            let name = format!("f{i}-{}", String::from_utf8_lossy(&random_name(8)));
            [
                builders::create_file(root, id, name.as_bytes()).build(),
                builders::write(id, 0, &random_data(payload_size)).build(),
            ]
        })
        .collect()
}
