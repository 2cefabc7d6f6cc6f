#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use plinth::hash::hash_int32;
use plinth::hashtable::{HopscotchTable, QuadraticTable, RobinHoodTable};
use std::collections::HashSet;

#[derive(Arbitrary, Debug)]
enum Op {
    Insert(u16),
    Remove(u16),
    Clear,
    Resize(u16),
}

// Churn all three policies through the same operation sequence against a
// model set; lookups and iteration must agree throughout. A weak hash
// (the low bits survive) keeps the probe paths under pressure.
fuzz_target!(|ops: Vec<Op>| {
    let h = |key: u16| hash_int32(key as u32 & 0x3f).as_u32();

    let mut quadratic: QuadraticTable<u16> = QuadraticTable::new(8, 8);
    let mut hopscotch: HopscotchTable<u16, 8> = HopscotchTable::new(8, 8);
    let mut robinhood: RobinHoodTable<u16> = RobinHoodTable::new(8, 8);
    let mut model: HashSet<u16> = HashSet::new();

    for op in ops {
        match op {
            Op::Insert(key) => {
                if model.insert(key) {
                    quadratic.insert(h(key), key);
                    hopscotch.insert(h(key), key);
                    robinhood.insert(h(key), key);
                }
            }
            Op::Remove(key) => {
                if model.remove(&key) {
                    let idx = quadratic.lookup(h(key), |&e| e == key).unwrap();
                    quadratic.remove(idx);
                    let idx = hopscotch.lookup(h(key), |&e| e == key).unwrap();
                    hopscotch.remove(idx);
                    let idx = robinhood.lookup(h(key), |&e| e == key).unwrap();
                    robinhood.remove(idx);
                }
            }
            Op::Clear => {
                model.clear();
                quadratic.clear();
                hopscotch.clear();
                robinhood.clear();
            }
            Op::Resize(cap) => {
                let cap = (cap as u32).min(1 << 12);
                quadratic.resize(cap);
                hopscotch.resize(cap);
                robinhood.resize(cap);
            }
        }
    }

    assert_eq!(quadratic.num_entries() as usize, model.len());
    assert_eq!(hopscotch.num_entries() as usize, model.len());
    assert_eq!(robinhood.num_entries() as usize, model.len());

    for &key in &model {
        assert!(quadratic.lookup(h(key), |&e| e == key).is_some());
        assert!(hopscotch.lookup(h(key), |&e| e == key).is_some());
        assert!(robinhood.lookup(h(key), |&e| e == key).is_some());
    }

    let collect = |it: &mut dyn Iterator<Item = u16>| it.collect::<HashSet<u16>>();
    assert_eq!(collect(&mut quadratic.iter().map(|(_, &e)| e)), model);
    assert_eq!(collect(&mut hopscotch.iter().map(|(_, &e)| e)), model);
    assert_eq!(collect(&mut robinhood.iter().map(|(_, &e)| e)), model);
});
