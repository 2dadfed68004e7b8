// tests/properties.rs
//
// Рандомизированные свойства обоих кодеков против эталонной BTreeMap:
// 1) После любой последовательности insert/overwrite/delete записи отсортированы,
//    содержимое совпадает с моделью, check() чист.
// 2) save -> load даёт байт-в-байт тот же буфер.
// 3) insert + delete того же ключа возвращает исходный буфер.
// 4) v2: сумма чанков записей == chunk_count, длина буфера == header + chunk_count*cs.

use anyhow::Result;
use std::collections::BTreeMap;

use oorandom::Rand64;

use QuiverSST::table::common::HEADER_SIZE;
use QuiverSST::{ChunkedTable, FixedPayloadTable, SortedTable, SstError};

fn random_key(rng: &mut Rand64, max_len: usize) -> Vec<u8> {
    let len = 1 + (rng.rand_u64() as usize) % max_len;
    // Узкий алфавит: больше совпадений префиксов и повторов.
    (0..len).map(|_| b'a' + (rng.rand_u64() % 4) as u8).collect()
}

fn random_value_of_len(rng: &mut Rand64, len: usize) -> Vec<u8> {
    let mut v = vec![0u8; len];
    for (i, b) in v.iter_mut().enumerate() {
        *b = (i as u8).wrapping_mul(31).wrapping_add(rng.rand_u64() as u8);
    }
    v
}

fn assert_matches_model(t: &dyn SortedTable, model: &BTreeMap<Vec<u8>, Vec<u8>>) -> Result<()> {
    let entries = t.entries()?;
    let expected: Vec<(Vec<u8>, Vec<u8>)> =
        model.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
    assert_eq!(entries, expected, "table content diverged from model");
    assert_eq!(t.len(), model.len());
    let report = t.check();
    assert!(report.ok(), "check problems: {:?}", report.problems);
    Ok(())
}

/// Прогон случайных операций. `value_len` выдаёт длину payload для очередной вставки.
fn churn(
    t: &mut dyn SortedTable,
    rng: &mut Rand64,
    steps: usize,
    mut value_len: impl FnMut(&mut Rand64) -> usize,
) -> Result<BTreeMap<Vec<u8>, Vec<u8>>> {
    let mut model: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();

    for step in 0..steps {
        let key = random_key(rng, 6);
        let dice = rng.rand_u64() % 10;
        if dice < 6 {
            let len = value_len(rng);
            let val = random_value_of_len(rng, len);
            let overwrite = rng.rand_u64() % 2 == 0;
            let before = t.as_bytes().to_vec();
            match t.put(&key, &val, overwrite) {
                Ok(()) => {
                    assert!(overwrite || !model.contains_key(&key), "step {step}");
                    model.insert(key, val);
                }
                Err(SstError::DuplicateKey) => {
                    assert!(!overwrite && model.contains_key(&key), "step {step}");
                    assert_eq!(t.as_bytes(), before.as_slice(), "step {step}");
                }
                Err(e) => return Err(e.into()),
            }
        } else {
            let before = t.as_bytes().to_vec();
            match t.remove(&key) {
                Ok(()) => {
                    assert!(model.remove(&key).is_some(), "step {step}");
                }
                Err(SstError::KeyNotFound) => {
                    assert!(!model.contains_key(&key), "step {step}");
                    assert_eq!(t.as_bytes(), before.as_slice(), "step {step}");
                }
                Err(e) => return Err(e.into()),
            }
        }

        if step % 50 == 0 {
            assert_matches_model(t, &model)?;
        }
    }
    assert_matches_model(t, &model)?;

    for (k, v) in &model {
        let (gk, gv) = t.get(k)?;
        assert_eq!(&gk, k);
        assert_eq!(&gv, v);
    }
    Ok(model)
}

#[test]
fn prop_fixed_random_ops_match_model() -> Result<()> {
    for seed in [1u128, 0xC0FFEE, 0xDEADBEEF] {
        let mut rng = Rand64::new(seed);
        let mut t = FixedPayloadTable::new(6);
        churn(&mut t, &mut rng, 600, |_| 6)?;

        let bytes = t.save().to_vec();
        let u = FixedPayloadTable::from_bytes(bytes.clone())?;
        assert_eq!(u.save(), bytes.as_slice());
    }
    Ok(())
}

#[test]
fn prop_chunked_random_ops_match_model() -> Result<()> {
    for (seed, cs) in [(7u128, 9u16), (0xA11CE, 16), (0xBEEF, 64)] {
        let mut rng = Rand64::new(seed);
        let mut t = ChunkedTable::new(cs)?;
        churn(&mut t, &mut rng, 600, |rng| (rng.rand_u64() % 90) as usize)?;

        // Учёт чанков.
        let mut chunks = 0usize;
        for rec in t.iter() {
            let rec = rec?;
            assert_eq!(rec.chunks, t.chunks_needed(rec.key.len() + rec.payload.len()));
            chunks += rec.chunks;
        }
        assert_eq!(chunks, t.chunk_count());
        assert_eq!(t.save().len(), HEADER_SIZE + t.chunk_count() * cs as usize);

        let bytes = t.save().to_vec();
        let u = ChunkedTable::from_bytes(bytes.clone())?;
        assert_eq!(u.save(), bytes.as_slice());
        assert_eq!(u.len(), t.len());
    }
    Ok(())
}

#[test]
fn prop_insert_then_delete_restores_bytes() -> Result<()> {
    let mut rng = Rand64::new(0x5EED);

    let mut fixed = FixedPayloadTable::new(3);
    let mut chunked = ChunkedTable::new(13)?;
    for i in 0..40u32 {
        let k = format!("base-{:02}", (i * 7) % 40);
        fixed.insert(k.as_bytes(), &random_value_of_len(&mut rng, 3), false)?;
        let len = (rng.rand_u64() % 30) as usize;
        chunked.insert(k.as_bytes(), &random_value_of_len(&mut rng, len), false)?;
    }

    for _ in 0..100 {
        let key = random_key(&mut rng, 10);

        let before = fixed.save().to_vec();
        if fixed.search(&key).is_err() {
            fixed.insert(&key, &random_value_of_len(&mut rng, 3), false)?;
            fixed.delete(&key)?;
            assert_eq!(fixed.save(), before.as_slice());
        }

        let before = chunked.save().to_vec();
        if chunked.search(&key).is_err() {
            let len = (rng.rand_u64() % 50) as usize;
            chunked.insert(&key, &random_value_of_len(&mut rng, len), false)?;
            chunked.delete(&key)?;
            assert_eq!(chunked.save(), before.as_slice());
        }
    }
    Ok(())
}

#[test]
fn prop_insertion_order_does_not_matter() -> Result<()> {
    let keys: Vec<Vec<u8>> = (0..64u32).map(|i| format!("k{:04}", i * 13).into_bytes()).collect();

    let build = |order: &[usize]| -> Result<(Vec<u8>, Vec<u8>)> {
        let mut f = FixedPayloadTable::new(4);
        let mut c = ChunkedTable::new(11)?;
        for &i in order {
            let v = (i as u32).to_le_bytes();
            f.insert(&keys[i], &v, false)?;
            c.insert(&keys[i], &v, false)?;
        }
        Ok((f.into_bytes(), c.into_bytes()))
    };

    let forward: Vec<usize> = (0..keys.len()).collect();
    let reverse: Vec<usize> = (0..keys.len()).rev().collect();
    let mut shuffled = forward.clone();
    let mut rng = Rand64::new(0x0DDBA11);
    for i in (1..shuffled.len()).rev() {
        let j = (rng.rand_u64() as usize) % (i + 1);
        shuffled.swap(i, j);
    }

    let a = build(&forward)?;
    assert_eq!(a, build(&reverse)?);
    assert_eq!(a, build(&shuffled)?);
    Ok(())
}
