//! End-to-end scenarios that exercise a full `Compiler::compile` run rather
//! than a single code generator method, covering cases the unit tests in
//! `src/codegen.rs` don't: struct field access, calls past the four
//! register-argument slots, the ternary operator, and `do`/`while`.

use mxcc::{Compiler, CompilerOptions};

fn compile(src: &str) -> String {
    Compiler::compile(src, CompilerOptions::default())
        .unwrap_or_else(|e| panic!("{:#}", e))
        .render()
}

#[test]
fn struct_field_access_reads_through_the_right_offset() {
    let asm = compile(
        r#"
        struct Point { int x; int y; };
        int main() {
            struct Point p;
            p.x = 1;
            p.y = 2;
            return p.y;
        }
        "#,
    );
    // y is the second field, laid out at an 8-byte stride past x.
    assert!(asm.contains("addq\t$8, %rax"));
}

#[test]
fn member_access_through_a_pointer_collapses_first() {
    let asm = compile(
        r#"
        struct Point { int x; int y; };
        int main() {
            struct Point p;
            struct Point* pp;
            pp = &p;
            return (*pp).y;
        }
        "#,
    );
    assert!(asm.contains("addq\t$8, %rax"));
}

#[test]
fn call_with_more_than_four_arguments_spills_to_the_stack() {
    let asm = compile(
        r#"
        int sum6(int a, int b, int c, int d, int e, int f);
        int main() {
            return sum6(1, 2, 3, 4, 5, 6);
        }
        "#,
    );
    // Two stack-passed args land at 32(%rsp) and 40(%rsp), past the 32-byte
    // shadow space; the frame must grow to fit them.
    assert!(asm.contains("subq\t$48, %rsp"));
    assert!(asm.contains("movq\t%rax, 32(%rsp)"));
    assert!(asm.contains("movq\t%rax, 40(%rsp)"));
    assert!(asm.contains("call\tsum6"));
}

#[test]
fn ternary_picks_the_right_branch_label() {
    let asm = compile("int main() { int x; x = 1; return x ? 10 : 20; }");
    assert!(asm.contains("_ternary_else_0"));
    assert!(asm.contains("_ternary_end_0"));
    assert!(asm.contains("movl\t$10, %eax"));
    assert!(asm.contains("movl\t$20, %eax"));
}

#[test]
fn do_while_runs_its_body_before_checking_the_condition() {
    let asm = compile(
        r#"
        int main() {
            int i;
            i = 0;
            do {
                i = i + 1;
            } while (i < 3);
            return i;
        }
        "#,
    );
    assert!(asm.contains("_do_start_0"));
    assert!(asm.contains("_do_cond_0"));
    assert!(asm.contains("jne\t_do_start_0"));
}

#[test]
fn nested_for_loops_get_independent_label_families() {
    let asm = compile(
        r#"
        int main() {
            int i;
            int total;
            total = 0;
            for (i = 0; i < 3; i = i + 1) {
                int j;
                for (j = 0; j < 3; j = j + 1) {
                    total = total + 1;
                }
            }
            return total;
        }
        "#,
    );
    assert!(asm.contains("_for_start_0"));
    assert!(asm.contains("_for_start_1"));
    assert!(asm.contains("_for_continue_0"));
    assert!(asm.contains("_for_continue_1"));
}

#[test]
fn recursive_call_round_trips_through_the_stack() {
    let asm = compile(
        r#"
        int fact(int n) {
            if (n <= 1) return 1;
            return n * fact(n - 1);
        }
        "#,
    );
    assert!(asm.contains(".globl\tfact"));
    assert!(asm.contains("call\tfact"));
}

#[test]
fn string_literal_allocates_and_stores_bytes_via_malloc() {
    let asm = compile(r#"int main() { char* s; s = "hi"; return 0; }"#);
    assert!(asm.contains("movq\t$3, %rcx"));
    assert!(asm.contains("call\tmalloc"));
    assert!(asm.contains("movb\t$104, 0(%rax)"));
    assert!(asm.contains("movb\t$105, 1(%rax)"));
    assert!(asm.contains("movb\t$0, 2(%rax)"));
}
