#![no_main]
use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use plinth::dstring::{DStr, NPOS};

#[derive(Arbitrary, Debug)]
enum Op<'a> {
    Append(&'a [u8]),
    Insert(u16, &'a [u8]),
    Replace(u16, u16, &'a [u8]),
    Erase(u16, u16),
    Strip(&'a [u8]),
    Substring(u16, u16),
    FindReplace(&'a [u8], &'a [u8], u8),
    Shrink,
    Clear,
}

// Drive a DStr through an arbitrary operation sequence against a Vec<u8>
// model; contents must agree and the trailing NUL must survive.
fuzz_target!(|ops: Vec<Op<'_>>| {
    let mut s = DStr::new();
    let mut model: Vec<u8> = Vec::new();

    for op in ops {
        match op {
            Op::Append(bytes) => {
                s.append(bytes);
                model.extend_from_slice(bytes);
            }
            Op::Insert(pos, bytes) => {
                let pos = (pos as usize).min(model.len());
                s.insert(pos, bytes);
                model.splice(pos..pos, bytes.iter().copied());
            }
            Op::Replace(pos, del, bytes) => {
                let pos = (pos as usize).min(model.len());
                let del = (del as usize).min(model.len() - pos);
                s.replace(pos, del, bytes);
                model.splice(pos..pos + del, bytes.iter().copied());
            }
            Op::Erase(pos, del) => {
                let pos = (pos as usize).min(model.len());
                let del = (del as usize).min(model.len() - pos);
                s.erase(pos, del);
                model.drain(pos..pos + del);
            }
            Op::Strip(set) => {
                s.strip(set);
                let start = model.iter().position(|b| !set.contains(b));
                match start {
                    None => model.clear(),
                    Some(start) => {
                        let end = model.iter().rposition(|b| !set.contains(b)).unwrap() + 1;
                        model = model[start..end].to_vec();
                    }
                }
            }
            Op::Substring(start, len) => {
                let start = (start as usize).min(model.len());
                let len = (len as usize).min(model.len() - start);
                s.substring(start, len);
                model = model[start..start + len].to_vec();
            }
            Op::FindReplace(needle, replacement, max) => {
                if !needle.is_empty() {
                    s.find_replace(needle, replacement, max as usize);
                    let mut done = 0usize;
                    let mut at = 0usize;
                    while done < max as usize {
                        let Some(pos) = model[at..]
                            .windows(needle.len())
                            .position(|w| w == needle)
                            .map(|p| p + at)
                        else {
                            break;
                        };
                        model.splice(pos..pos + needle.len(), replacement.iter().copied());
                        at = pos + replacement.len();
                        done += 1;
                    }
                }
            }
            Op::Shrink => s.shrink_to_fit(),
            Op::Clear => {
                s.clear();
                model.clear();
            }
        }
        assert_eq!(&s[..], &model[..]);
        assert_eq!(s.len(), model.len());
    }

    let len = s.len();
    let bytes = s.into_bytes_with_nul();
    assert_eq!(bytes.len(), len + 1);
    assert_eq!(bytes[len], 0);
    assert_eq!(&bytes[..len], &model[..]);
});
