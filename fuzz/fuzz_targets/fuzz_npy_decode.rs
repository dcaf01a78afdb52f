#![no_main]

use libfuzzer_sys::fuzz_target;
use npc_io::{encode_array, read_npy_bytes};
use npc_ndarray::{IndexCursor, flatten_index};

// Seed with the fixture corpus: `make_fixture_corpus --out fuzz/corpus/fuzz_npy_decode`.
fuzz_target!(|data: &[u8]| {
    let Ok(array) = read_npy_bytes(data) else {
        return;
    };
    let Ok(values) = array.elements() else {
        return;
    };
    let order = array.header.memory_order();
    let mut visited = 0usize;
    for index in IndexCursor::new(&array.header.shape, order) {
        assert_eq!(flatten_index(&array.header.shape, order, &index), visited);
        visited += 1;
    }
    assert_eq!(visited, values.len());

    // Accepted arrays re-encode; bool bytes other than 0/1 normalize, so
    // compare decoded elements rather than payload bytes.
    let encoded = encode_array(&array.header, &values).expect("accepted arrays re-encode");
    let again = read_npy_bytes(&encoded).expect("re-encoded bytes decode");
    assert_eq!(again.header, array.header);
    let round_tripped = again.elements().expect("re-encoded elements decode");
    assert!(
        round_tripped
            .iter()
            .zip(&values)
            .all(|(lhs, rhs)| lhs.bit_eq(rhs))
    );
});
