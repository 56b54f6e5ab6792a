use md5::Digest;

use crate::models::RawTransfer;

/// Mimics Python's `repr()` for a plain ASCython string: single-quoted,
/// backslash and quote escaped. Etherscan fields are hex/decimal ASCII so
/// this never needs to handle anything fancier.
fn py_repr_str(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 2);
    out.push('\'');
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            _ => out.push(c),
        }
    }
    out.push('\'');
    out
}

/// Recreates the content-hash identity used by the original pipeline:
/// `hashlib.md5(str(tx).encode("utf-8")).hexdigest()` over a dict with
/// keys in exactly this order, before `block_hash`/`tx_hash`/`log_index`
/// are stripped. `block_number` is the only field rendered unquoted
/// (Python's `int(tx["blockNumber"])` makes it a genuine int in the dict).
pub fn transfer_id(tx: &RawTransfer) -> String {
    let digest = md5::Md5::digest(canonical_rendering(tx).as_bytes());
    hex_lower(&digest)
}

fn canonical_rendering(tx: &RawTransfer) -> String {
    format!(
        "{{'block_hash': {}, 'tx_hash': {}, 'log_index': {}, 'timestamp': {}, 'block_number': {}, 'token_id': {}, 'from_address': {}, 'to_address': {}, 'value': {}}}",
        py_repr_str(&tx.block_hash),
        py_repr_str(&tx.tx_hash),
        py_repr_str(&tx.log_index),
        py_repr_str(&tx.timestamp),
        tx.block_number,
        py_repr_str(&tx.token_id),
        py_repr_str(&tx.from_address),
        py_repr_str(&tx.to_address),
        py_repr_str(&tx.value),
    )
}

fn hex_lower(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RawTransfer {
        RawTransfer {
            block_hash: "0xblockhash".to_string(),
            tx_hash: "0xtxhash".to_string(),
            log_index: "5".to_string(),
            timestamp: "1600000000".to_string(),
            block_number: 100,
            token_id: "0xtoken".to_string(),
            from_address: "0xfrom".to_string(),
            to_address: "0xto".to_string(),
            value: "1000000000000000000".to_string(),
        }
    }

    #[test]
    fn canonical_rendering_matches_python_dict_repr() {
        let expected = "{'block_hash': '0xblockhash', 'tx_hash': '0xtxhash', 'log_index': '5', \
'timestamp': '1600000000', 'block_number': 100, 'token_id': '0xtoken', \
'from_address': '0xfrom', 'to_address': '0xto', 'value': '1000000000000000000'}";
        assert_eq!(canonical_rendering(&sample()), expected);
    }

    #[test]
    fn id_is_a_32_char_hex_digest() {
        let id = transfer_id(&sample());
        assert_eq!(id.len(), 32);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn same_logical_transfer_hashes_identically() {
        assert_eq!(transfer_id(&sample()), transfer_id(&sample()));
    }

    #[test]
    fn differing_value_changes_the_hash() {
        let mut other = sample();
        other.value = "2".to_string();
        assert_ne!(transfer_id(&sample()), transfer_id(&other));
    }
}
