use anyhow::Result;
use byteorder::{ByteOrder, LittleEndian};

use QuiverSST::table::common::HEADER_SIZE;
use QuiverSST::{ChunkedTable, HeaderError, Nearest, SstError};

#[test]
fn chunked_long_key_spans_three_chunks() -> Result<()> {
    let mut t = ChunkedTable::new(16)?;
    let key = b"longkeyabove8bytes";
    t.insert(key, b"p", false)?;

    assert_eq!(t.chunks_needed(key.len() + 1), 3);
    assert_eq!(t.chunk_count(), 3);
    assert_eq!(t.len(), 1);
    assert_eq!(t.save().len(), HEADER_SIZE + 3 * 16);
    assert_eq!(LittleEndian::read_u32(&t.save()[12..16]), 3);

    let rec = t.search(key)?;
    assert_eq!(rec.key, key.to_vec());
    assert_eq!(rec.payload, b"p".to_vec());
    assert_eq!(rec.offset, HEADER_SIZE);
    assert_eq!(rec.chunks, 3);
    Ok(())
}

#[test]
fn chunked_rejects_empty_key_and_small_chunks() -> Result<()> {
    assert_eq!(ChunkedTable::new(8).unwrap_err(), SstError::InvalidChunkSize(8));
    assert_eq!(ChunkedTable::new(0).unwrap_err(), SstError::InvalidChunkSize(0));

    let mut t = ChunkedTable::new(12)?;
    let before = t.save().to_vec();
    assert_eq!(t.insert(b"", b"x", false).unwrap_err(), SstError::EmptyKey);
    assert_eq!(t.search(b"").unwrap_err(), SstError::EmptyKey);
    assert_eq!(t.search_nearest(b"").unwrap_err(), SstError::EmptyKey);
    assert_eq!(t.delete(b"").unwrap_err(), SstError::EmptyKey);
    assert_eq!(t.save(), before.as_slice());

    // init с неверным размером не трогает таблицу.
    assert_eq!(t.init(4).unwrap_err(), SstError::InvalidChunkSize(4));
    assert_eq!(t.chunk_size(), 12);
    Ok(())
}

#[test]
fn chunked_empty_record_takes_one_chunk() -> Result<()> {
    let t = ChunkedTable::new(16)?;
    assert_eq!(t.chunks_needed(0), 1);

    let (bytes, n) = t.encode_record(b"", b"")?;
    assert_eq!(n, 1);
    assert_eq!(bytes.len(), 16);
    assert_eq!(&bytes[..8], &[1u8, 0, 0, 0, 0, 0, 0, 0]);
    assert!(bytes[8..].iter().all(|&b| b == 0));
    Ok(())
}

#[test]
fn chunked_empty_payload_and_search_order() -> Result<()> {
    let mut t = ChunkedTable::new(12)?;
    t.insert(b"m", b"", false)?;
    t.insert(b"a", b"first", false)?;
    t.insert(b"zz", b"a payload that spans several chunks", false)?;
    t.insert(b"k", b"mid", false)?;

    assert_eq!(t.len(), 4);
    assert_eq!(t.search(b"m")?.payload, Vec::<u8>::new());
    assert_eq!(t.search(b"m")?.chunks, 1);
    assert_eq!(t.search(b"zz")?.payload, b"a payload that spans several chunks".to_vec());

    let keys: Vec<Vec<u8>> = t.iter().map(|r| r.map(|r| r.key)).collect::<Result<_, _>>()?;
    assert_eq!(
        keys,
        vec![b"a".to_vec(), b"k".to_vec(), b"m".to_vec(), b"zz".to_vec()]
    );
    assert!(t.check().ok());
    Ok(())
}

#[test]
fn chunked_empty_table_search() -> Result<()> {
    let t = ChunkedTable::new(32)?;
    assert!(t.is_empty());
    assert_eq!(t.save().len(), HEADER_SIZE);
    assert_eq!(t.search(b"nope").unwrap_err(), SstError::KeyNotFound);
    assert_eq!(t.search_nearest(b"nope")?, Nearest::EmptyTable);
    Ok(())
}

#[test]
fn chunked_search_nearest_returns_anchor() -> Result<()> {
    let mut t = ChunkedTable::new(16)?;
    for k in [b"b", b"d", b"f"] {
        t.insert(k, b"v", false)?;
    }

    match t.search_nearest(b"d")? {
        Nearest::Exact(r) => assert_eq!(r.key, b"d".to_vec()),
        other => panic!("expected exact hit, got {:?}", other),
    }

    // Якорь: соседняя запись, между которой и ключом нет других ключей.
    for (target, neighbours) in [
        (&b"a"[..], [&b"b"[..], &b"b"[..]]),
        (&b"c"[..], [&b"b"[..], &b"d"[..]]),
        (&b"e"[..], [&b"d"[..], &b"f"[..]]),
        (&b"g"[..], [&b"f"[..], &b"f"[..]]),
    ] {
        match t.search_nearest(target)? {
            Nearest::Anchor(r) => assert!(
                r.key == neighbours[0] || r.key == neighbours[1],
                "target {:?}: anchor {:?}",
                target,
                r.key
            ),
            other => panic!("expected anchor, got {:?}", other),
        }
    }
    Ok(())
}

#[test]
fn chunked_record_lookup_from_any_chunk() -> Result<()> {
    let mut t = ChunkedTable::new(12)?;
    t.insert(b"alpha", b"0123456789abcdef", false)?; // 21 B -> 6 чанков
    t.insert(b"beta", b"x", false)?;

    let first = t.search(b"alpha")?;
    assert_eq!(first.chunks, 6);
    for i in 0..first.chunks {
        let rec = t.get_record_at_chunk_offset(first.offset + i * 12)?;
        assert_eq!(rec, first);
    }

    let beta = t.get_record_at_chunk_offset(first.offset + 6 * 12)?;
    assert_eq!(beta.key, b"beta".to_vec());

    // Смещение не на границе чанка и за пределами области.
    assert!(matches!(
        t.get_record_at_chunk_offset(first.offset + 5).unwrap_err(),
        SstError::Corrupt(_)
    ));
    assert!(matches!(
        t.get_record_at_chunk_offset(t.save().len()).unwrap_err(),
        SstError::Corrupt(_)
    ));
    Ok(())
}

#[test]
fn chunked_duplicate_and_overwrite() -> Result<()> {
    let mut t = ChunkedTable::new(16)?;
    t.insert(b"a", b"1", false)?;
    t.insert(b"b", b"2", false)?;
    t.insert(b"c", b"3", false)?;
    let before = t.save().to_vec();

    assert_eq!(t.insert(b"b", b"x", false).unwrap_err(), SstError::DuplicateKey);
    assert_eq!(t.save(), before.as_slice());

    // Перезапись с ростом: 1 чанк -> 4 чанка.
    let big = vec![0x5Au8; 30];
    t.insert(b"b", &big, true)?;
    assert_eq!(t.len(), 3);
    assert_eq!(t.chunk_count(), 1 + 4 + 1);
    assert_eq!(t.search(b"b")?.payload, big);
    assert_eq!(t.search(b"c")?.payload, b"3".to_vec());

    // И обратно: 4 -> 1.
    t.insert(b"b", b"2", true)?;
    assert_eq!(t.chunk_count(), 3);
    assert_eq!(t.save(), before.as_slice());
    Ok(())
}

#[test]
fn chunked_delete() -> Result<()> {
    let mut t = ChunkedTable::new(16)?;
    t.insert(b"one", b"payload-1", false)?;
    t.insert(b"two", b"payload-two-is-longer", false)?;
    t.insert(b"three", b"3", false)?;
    let chunks = t.chunk_count();
    let before = t.save().to_vec();

    assert_eq!(t.delete(b"four").unwrap_err(), SstError::KeyNotFound);
    assert_eq!(t.save(), before.as_slice());

    let two = t.search(b"two")?;
    t.delete(b"two")?;
    assert_eq!(t.len(), 2);
    assert_eq!(t.chunk_count(), chunks - two.chunks);
    assert_eq!(t.search(b"two").unwrap_err(), SstError::KeyNotFound);
    assert_eq!(t.search(b"one")?.payload, b"payload-1".to_vec());
    assert!(t.check().ok());
    Ok(())
}

#[test]
fn chunked_save_load_roundtrip() -> Result<()> {
    let mut t = ChunkedTable::new(20)?;
    for i in 0..50u32 {
        let key = format!("key-{:03}", (i * 37) % 50);
        let val = vec![i as u8; (i as usize * 3) % 40];
        t.insert(key.as_bytes(), &val, false)?;
    }
    let bytes = t.save().to_vec();

    let mut u = ChunkedTable::new(64)?;
    u.load(bytes.clone())?;
    assert_eq!(u.chunk_size(), 20);
    assert_eq!(u.len(), 50);
    assert_eq!(u.chunk_count(), t.chunk_count());
    assert_eq!(u.save(), bytes.as_slice());
    assert!(u.check().ok());

    let v = ChunkedTable::from_bytes(t.into_bytes())?;
    assert_eq!(v.search(b"key-007")?.payload, u.search(b"key-007")?.payload);
    Ok(())
}

#[test]
fn chunked_load_rejects_bad_buffers() -> Result<()> {
    let mut t = ChunkedTable::new(16)?;
    t.insert(b"alpha", b"beta-gamma-delta", false)?;
    let good = t.save().to_vec();

    let mut target = ChunkedTable::new(24)?;
    let pristine = target.save().to_vec();

    let mut bad = good.clone();
    LittleEndian::write_u16(&mut bad[8..10], 1);
    assert_eq!(
        target.load(bad).unwrap_err(),
        SstError::Header(HeaderError::BadVersion {
            expected: 2,
            found: 1
        })
    );

    assert!(matches!(
        target.load(good[..good.len() - 3].to_vec()).unwrap_err(),
        SstError::Header(HeaderError::Truncated { .. })
    ));

    let mut bad = good.clone();
    bad.extend_from_slice(&[0u8; 16]);
    assert!(matches!(target.load(bad).unwrap_err(), SstError::Corrupt(_)));

    // chunk_size в заголовке слишком мал.
    let mut bad = good.clone();
    LittleEndian::write_u16(&mut bad[10..12], 8);
    assert_eq!(target.load(bad).unwrap_err(), SstError::InvalidChunkSize(8));

    // Испорченный chunk_index во втором чанке записи.
    let mut bad = good.clone();
    LittleEndian::write_u16(&mut bad[HEADER_SIZE + 16 + 2..HEADER_SIZE + 16 + 4], 7);
    assert!(matches!(target.load(bad).unwrap_err(), SstError::Corrupt(_)));

    assert_eq!(target.save(), pristine.as_slice());
    assert_eq!(target.chunk_size(), 24);
    Ok(())
}

#[test]
fn chunked_check_reports_out_of_order_keys() -> Result<()> {
    let mut t = ChunkedTable::new(16)?;
    t.insert(b"a", b"1", false)?;
    t.insert(b"b", b"2", false)?;
    assert!(t.check().ok());

    // Меняем местами два одночанковых блока: структура цела, порядок нарушен.
    let mut bytes = t.save().to_vec();
    let (first, second) = bytes[HEADER_SIZE..].split_at_mut(16);
    first.swap_with_slice(&mut second[..16]);
    let u = ChunkedTable::from_bytes(bytes)?;

    let report = u.check();
    assert!(!report.ok());
    assert_eq!(report.records, 2);
    assert_eq!(report.chunks, Some(2));
    assert!(report.problems.iter().any(|p| p.contains("out of order")));
    Ok(())
}

#[test]
fn chunked_size_limits_reject_without_touching_buffer() -> Result<()> {
    let mut t = ChunkedTable::new(9)?; // 1 байт данных на чанк
    t.insert(b"a", b"1", false)?;
    let before = t.save().to_vec();

    // key_len / payload_len не помещаются в u16.
    let long = vec![b'k'; 70_000];
    assert!(matches!(t.insert(&long, b"v", false).unwrap_err(), SstError::TooLarge(_)));
    assert!(matches!(t.insert(b"b", &long, false).unwrap_err(), SstError::TooLarge(_)));
    assert_eq!(t.save(), before.as_slice());

    // 1 + 65535 байт при ёмкости 1: 65536 чанков, total_chunks не помещается в u16.
    let payload = vec![0x11u8; u16::MAX as usize];
    let err = t.insert(b"b", &payload, false).unwrap_err();
    assert!(matches!(err, SstError::TooLarge(_)));
    assert!(err.is_recoverable());
    assert_eq!(t.save(), before.as_slice());
    assert_eq!(t.len(), 1);

    // Перезапись тоже не должна портить буфер.
    assert!(matches!(t.insert(b"a", &payload, true).unwrap_err(), SstError::TooLarge(_)));
    assert_eq!(t.save(), before.as_slice());

    // Ровно u16::MAX чанков ещё допустимо.
    t.insert(b"b", &payload[..u16::MAX as usize - 1], false)?;
    let rec = t.search(b"b")?;
    assert_eq!(rec.chunks, u16::MAX as usize);
    assert_eq!(rec.payload.len(), u16::MAX as usize - 1);
    assert!(t.check().ok());
    Ok(())
}

#[test]
fn chunked_max_chunk_size_holds_max_payload() -> Result<()> {
    let mut t = ChunkedTable::new(u16::MAX)?;
    let payload: Vec<u8> = (0..u16::MAX as usize).map(|i| (i % 251) as u8).collect();
    t.insert(b"k", &payload, false)?;

    let rec = t.search(b"k")?;
    assert_eq!(rec.chunks, 2);
    assert_eq!(rec.payload, payload);
    assert_eq!(t.save().len(), HEADER_SIZE + 2 * u16::MAX as usize);

    let u = ChunkedTable::from_bytes(t.save().to_vec())?;
    assert_eq!(u.search(b"k")?.payload, payload);
    Ok(())
}
