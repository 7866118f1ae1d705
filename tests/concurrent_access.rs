mod support;

use profile_index::{PartitionId, ProfileIndex};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use support::{device, partitions, profile, sorted};

#[test]
fn concurrent_readers_agree_without_writers() -> anyhow::Result<()> {
    let index = Arc::new(ProfileIndex::new());
    let p = profile();
    let members: Vec<_> = (0..64).map(|_| device()).collect();
    for (i, m) in members.iter().enumerate() {
        index.add(p, *m, PartitionId((i % 4) as u32), true)?;
    }
    let expected = sorted(members);

    let mut handles = vec![];
    for _ in 0..8 {
        let index = Arc::clone(&index);
        let expected = expected.clone();
        handles.push(thread::spawn(move || {
            for _ in 0..500 {
                assert_eq!(sorted(index.local_members(&p)), expected);
            }
        }));
    }

    for h in handles {
        h.join().unwrap();
    }
    Ok(())
}

#[test]
fn readers_never_observe_a_partial_rebuild() -> anyhow::Result<()> {
    let index = Arc::new(ProfileIndex::new());
    let p = profile();
    let first: Vec<_> = (0..32).map(|_| device()).collect();
    let second: Vec<_> = (0..32).map(|_| device()).collect();
    for m in &first {
        index.add(p, *m, PartitionId(1), false)?;
    }
    for m in &second {
        index.add(p, *m, PartitionId(2), false)?;
    }
    index.set_owned_partitions(partitions(&[1]));

    let only_first = sorted(first.clone());
    let both = sorted(first.into_iter().chain(second).collect());
    let done = Arc::new(AtomicBool::new(false));

    let mut readers = vec![];
    for _ in 0..4 {
        let index = Arc::clone(&index);
        let done = Arc::clone(&done);
        let only_first = only_first.clone();
        let both = both.clone();
        readers.push(thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                let seen = sorted(index.local_members(&p));
                assert!(seen == only_first || seen == both, "torn read: {} members", seen.len());
            }
        }));
    }

    let writer = {
        let index = Arc::clone(&index);
        thread::spawn(move || {
            for round in 0..200 {
                if round % 2 == 0 {
                    index.set_owned_partitions(partitions(&[1, 2]));
                } else {
                    index.set_owned_partitions(partitions(&[1]));
                }
            }
        })
    };

    writer.join().unwrap();
    done.store(true, Ordering::Release);
    for h in readers {
        h.join().unwrap();
    }
    Ok(())
}

#[test]
fn moves_are_atomic_to_snapshots() -> anyhow::Result<()> {
    let index = Arc::new(ProfileIndex::new());
    let (a, b) = (profile(), profile());
    let m = device();
    index.add(a, m, PartitionId(0), true)?;
    let done = Arc::new(AtomicBool::new(false));

    let reader = {
        let index = Arc::clone(&index);
        let done = Arc::clone(&done);
        thread::spawn(move || {
            while !done.load(Ordering::Acquire) {
                let snapshot = index.snapshot();
                let in_a = snapshot.local.get(&a).is_some_and(|s| s.contains(&m));
                let in_b = snapshot.local.get(&b).is_some_and(|s| s.contains(&m));
                assert!(in_a ^ in_b, "member must belong to exactly one profile");
            }
        })
    };

    let writer = {
        let index = Arc::clone(&index);
        thread::spawn(move || -> anyhow::Result<()> {
            for round in 0..500 {
                let (from, to) = if round % 2 == 0 { (a, b) } else { (b, a) };
                index.move_member(from, to, m, PartitionId(0), true)?;
            }
            Ok(())
        })
    };

    writer.join().unwrap()?;
    done.store(true, Ordering::Release);
    reader.join().unwrap();
    Ok(())
}
