mod common;

const SOURCE: &str = r#"
int fib(int n) {
    if (n < 2) {
        return n;
    }
    return fib(n - 1) + fib(n - 2);
}

int main() {
    int i;
    for (i = 0; i < 15; ++i) {
        printf("fib(%d) = %d\n", i, fib(i));
    }
    return 0;
}
"#;

#[test]
fn compile_and_run_fib() {
    let mut expected = String::new();
    let mut pair = (0u32, 1u32);
    for i in 0..15 {
        expected.push_str(&format!("fib({i}) = {}\n", pair.0));
        pair = (pair.1, pair.0 + pair.1);
    }

    assert_eq!(common::compile_and_run(SOURCE, "fib"), expected);
}
