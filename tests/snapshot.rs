mod common;

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use bitvec::vec::BitVec;
use common::{at, fresh, snapshot_path};
use fatsim::{Block, Entry, Error, FatEntry, FileSystem, Namespace, RamDisk, BLOCK_SIZE};

/// Rewrites the block records of a saved snapshot, letting `edit` set the raw
/// (length, bytes) pair of every block. The other three records are kept as is.
fn rewrite_blocks(path: &Path, edit: impl Fn(usize, &mut (u16, [u8; BLOCK_SIZE]))) {
    let mut reader = BufReader::new(File::open(path).unwrap());
    let namespace: Namespace = bincode::deserialize_from(&mut reader).unwrap();
    let bitmap: BitVec = bincode::deserialize_from(&mut reader).unwrap();
    let blocks: Vec<Block> = bincode::deserialize_from(&mut reader).unwrap();
    let entries: Vec<FatEntry> = bincode::deserialize_from(&mut reader).unwrap();
    drop(reader);

    let raw: Vec<(u16, [u8; BLOCK_SIZE])> = blocks
        .iter()
        .enumerate()
        .map(|(idx, block)| {
            let mut data = [0u8; BLOCK_SIZE];
            data[..block.len()].copy_from_slice(block.as_bytes());
            let mut pair = (block.len() as u16, data);
            edit(idx, &mut pair);
            pair
        })
        .collect();

    let mut writer = BufWriter::new(File::create(path).unwrap());
    bincode::serialize_into(&mut writer, &namespace).unwrap();
    bincode::serialize_into(&mut writer, &bitmap).unwrap();
    bincode::serialize_into(&mut writer, &raw).unwrap();
    bincode::serialize_into(&mut writer, &entries).unwrap();
    writer.flush().unwrap();
}

/// Saves a 16-block file system holding `/f` = "abcdefg" (blocks 0 and 1).
fn save_one_file(path: &Path) {
    let mut fs = fresh(16);
    let root = fs.root();
    let f = fs.create_file(root, "f", at(1)).unwrap();
    fs.write(f, b"abcdefg", at(2)).unwrap();
    fs.save(path).unwrap();
}

#[test]
fn test_round_trip() {
    let path = snapshot_path("round_trip");
    let mut fs = fresh(64);
    let root = fs.root();
    let docs = fs.create_directory(root, "docs", at(1)).unwrap();
    let nested = fs.create_directory(docs, "nested", at(2)).unwrap();
    let a = fs.create_file(docs, "a.txt", at(3)).unwrap();
    let b = fs.create_file(nested, "b.txt", at(4)).unwrap();
    let gone = fs.create_file(root, "gone", at(5)).unwrap();
    fs.write(gone, b"temporary", at(6)).unwrap();
    fs.write(a, b"alpha beta gamma", at(7)).unwrap();
    fs.write(b, b"delta", at(8)).unwrap();
    fs.delete_file(gone).unwrap();
    fs.save(&path).unwrap();

    let loaded = FileSystem::load_into(&path, RamDisk::new(64)).unwrap();
    log!("loaded: {}", loaded.dump());
    assert_eq!(loaded.dump(), fs.dump());
    assert_eq!(loaded.store().bitmap(), fs.store().bitmap());
    assert_eq!(loaded.fat(), fs.fat());
    for block in 0..64 {
        assert_eq!(
            loaded.store().read_block(block).unwrap(),
            fs.store().read_block(block).unwrap()
        );
    }

    assert_eq!(loaded.lookup("/docs/a.txt").unwrap(), Entry::File(a));
    assert_eq!(loaded.read(a).unwrap(), b"alpha beta gamma");
    assert_eq!(loaded.read(b).unwrap(), b"delta");
    assert_eq!(loaded.chain_of(a).unwrap(), fs.chain_of(a).unwrap());
    let record = loaded.file(a).unwrap();
    assert_eq!(record.created_at, at(3));
    assert_eq!(record.modified_at, at(7));
    assert_eq!(loaded.directory(nested).unwrap().created_at, at(2));
    assert_eq!(loaded.child_count(root).unwrap(), 1);
    loaded.verify().unwrap();

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_loaded_state_stays_usable() {
    let path = snapshot_path("usable");
    let mut fs = fresh(16);
    let root = fs.root();
    let f = fs.create_file(root, "f", at(1)).unwrap();
    fs.write(f, b"12345", at(2)).unwrap();
    fs.save(&path).unwrap();

    let mut loaded = FileSystem::load_into(&path, RamDisk::new(16)).unwrap();
    let g = loaded.create_file(root, "g", at(3)).unwrap();
    assert!(matches!(loaded.create_file(root, "f", at(3)), Err(Error::DuplicateName(_))));
    loaded.write(g, b"xyz", at(4)).unwrap();
    // Blocks 0 and 1 belong to f, so first-fit continues at 2.
    assert_eq!(loaded.chain_of(g).unwrap(), vec![2]);
    loaded.verify().unwrap();

    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_missing_snapshot_bootstraps_demo() {
    let path = snapshot_path("missing");
    let fs = FileSystem::load(&path).unwrap();
    assert!(matches!(fs.lookup("/folder1/folder2/folder3"), Ok(Entry::Directory(_))));
    assert!(matches!(fs.lookup("/file1"), Ok(Entry::File(_))));
    assert!(matches!(fs.lookup("/folder1/file2"), Ok(Entry::File(_))));
    assert!(matches!(fs.lookup("/folder1/file3"), Ok(Entry::File(_))));
    assert_eq!(fs.used_blocks(), 0);
    assert!(!path.exists());
}

#[test]
fn test_device_size_mismatch() {
    let path = snapshot_path("mismatch");
    fresh(16).save(&path).unwrap();
    let result = FileSystem::load_into(&path, RamDisk::new(32));
    assert!(matches!(result, Err(Error::Corrupted(_))));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_garbage_snapshot() {
    let path = snapshot_path("garbage");
    std::fs::write(&path, b"definitely not a snapshot").unwrap();
    let result = FileSystem::load_into(&path, RamDisk::new(16));
    assert!(matches!(result, Err(Error::Codec(_))));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_save_overwrites() {
    let path = snapshot_path("overwrite");
    let mut fs = fresh(16);
    let root = fs.root();
    fs.create_file(root, "first", at(1)).unwrap();
    fs.save(&path).unwrap();
    fs.format().unwrap();
    fs.create_directory(root, "second", at(2)).unwrap();
    fs.save(&path).unwrap();

    let loaded = FileSystem::load_into(&path, RamDisk::new(16)).unwrap();
    assert!(matches!(loaded.lookup("/first"), Err(Error::NotFound)));
    assert!(matches!(loaded.lookup("/second"), Ok(Entry::Directory(_))));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_block_length_beyond_capacity() {
    let path = snapshot_path("oversized_block");
    save_one_file(&path);
    rewrite_blocks(&path, |idx, pair| {
        if idx == 0 {
            pair.0 = 200;
        }
    });
    let result = FileSystem::load_into(&path, RamDisk::new(16));
    assert!(matches!(result, Err(Error::Corrupted(_))));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_chain_bytes_must_match_length() {
    let path = snapshot_path("short_chain");
    save_one_file(&path);
    // Still within capacity, but the chain now stores 5 bytes for a 7 byte file.
    rewrite_blocks(&path, |idx, pair| {
        if idx == 0 {
            pair.0 = 2;
        }
    });
    let result = FileSystem::load_into(&path, RamDisk::new(16));
    assert!(matches!(result, Err(Error::Corrupted(_))));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_free_block_with_content() {
    let path = snapshot_path("dirty_free_block");
    save_one_file(&path);
    rewrite_blocks(&path, |idx, pair| {
        if idx == 5 {
            *pair = (1, *b"z\0\0\0");
        }
    });
    let result = FileSystem::load_into(&path, RamDisk::new(16));
    assert!(matches!(result, Err(Error::Corrupted(_))));
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_untouched_rewrite_still_loads() {
    let path = snapshot_path("identity_rewrite");
    save_one_file(&path);
    rewrite_blocks(&path, |_, _| {});
    let loaded = FileSystem::load_into(&path, RamDisk::new(16)).unwrap();
    let Entry::File(f) = loaded.lookup("/f").unwrap() else {
        panic!("expected a file");
    };
    assert_eq!(loaded.read(f).unwrap(), b"abcdefg");
    std::fs::remove_file(&path).unwrap();
}

#[test]
fn test_default_snapshot_location() {
    let path = Path::new(fatsim::DEFAULT_SNAPSHOT);
    let _ = std::fs::remove_file(path);

    let mut fs = FileSystem::load_default().unwrap();
    assert!(matches!(fs.lookup("/folder1/file2"), Ok(Entry::File(_))));
    let notes = fs.create_file_at("/folder1/notes", at(1)).unwrap();
    fs.write(notes, b"kept between sessions", at(2)).unwrap();
    fs.save_default().unwrap();
    assert!(path.exists());

    let loaded = FileSystem::load_default().unwrap();
    assert_eq!(loaded.read(notes).unwrap(), b"kept between sessions");
    std::fs::remove_file(path).unwrap();
}
