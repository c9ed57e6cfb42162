#![no_main]
use libfuzzer_sys::fuzz_target;

use ranked_avl::model::run_removal_balance;

fuzz_target!(|input: (Vec<u32>, Vec<usize>)| {
    let (keys, removal_order) = input;
    run_removal_balance(keys, removal_order);
});
