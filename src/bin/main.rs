use ranked_avl::SearchTree;

fn main() {
    let mut tree = SearchTree::new();

    for key in [5, 3, 8, 1, 4, 7, 9] {
        tree.insert(key);
        tree.assert_invariants();
        println!("{:?}", tree.iter().collect::<Vec<_>>());
    }

    println!("find(4) = {:?}", tree.find(&4));
    println!("find(6) = {:?}", tree.find(&6));

    assert!(tree.remove(&5));
    tree.assert_invariants();
    println!("{:?}", tree.iter().collect::<Vec<_>>());

    for rank in 0..tree.len() {
        println!("tree[{rank}] = {}", tree[rank]);
    }

    #[cfg(feature = "print")]
    print!("{}", tree.sideways());

    drop(tree);
}
