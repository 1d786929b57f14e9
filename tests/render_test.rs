use curly::{CurlyError, EvaluateError, ParseError, Value, context, render};
use std::sync::Once;

static INIT: Once = Once::new();

fn init_logger() {
    INIT.call_once(|| {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("debug"))
            .is_test(true)
            .init();
    });
}

fn parse_error(tpl: &str) -> ParseError {
    init_logger();
    match render(tpl, &context! { "var" => 1 }) {
        Err(CurlyError::Parse(e)) => e,
        other => panic!("Expected parse error for {tpl:?}, got {other:?}"),
    }
}

#[test]
fn test_nothing_to_do() {
    init_logger();
    for tpl in ["", "hello", "hello {", "hello {{", "{% {? {{ {{ lala }", "a % } b"] {
        assert_eq!(render(tpl, &context! {}).unwrap(), tpl);
    }
}

#[test]
fn test_print_tag() {
    init_logger();
    assert_eq!(
        render("Hello {{ name }}", &context! { "name" => "World" }).unwrap(),
        "Hello World"
    );

    let tpl = "Hello {{ name }} {{ title }}{{name}} {{\n\ntitle\n}}";
    assert_eq!(
        render(tpl, &context! { "name" => "NAME", "title" => "TT" }).unwrap(),
        "Hello NAME TTNAME TT"
    );
}

#[test]
fn test_print_scalars() {
    let ctx = context! {
        "t" => true,
        "n" => Value::Null,
        "i" => -4,
        "f" => 2.5,
        "l" => vec!["a", "b"],
    };
    assert_eq!(
        render("{{ t }}|{{ n }}|{{ i }}|{{ f }}|{{ l }}|{{ l.1 }}", &ctx).unwrap(),
        "true||-4|2.5|[a, b]|b"
    );
}

#[test]
fn test_if_tag() {
    let tpl = "Hello {% if qq %}QQ{%/if%} {%if   pp  %}PP{% /if%} Hello";
    assert_eq!(
        render(tpl, &context! { "qq" => false, "pp" => true }).unwrap(),
        "Hello  PP Hello"
    );
}

#[test]
fn test_elif_tag() {
    let tpl = "{% if x %}A{% elif y %}B{% else %}C{% /if %}";
    assert_eq!(
        render(tpl, &context! { "x" => false, "y" => true }).unwrap(),
        "B"
    );

    let tpl = "Hello {% if qq %}1{%elif pp%}2{%else%}3{%/if%}";
    assert_eq!(
        render(tpl, &context! { "qq" => false, "pp" => true }).unwrap(),
        "Hello 2"
    );
}

#[test]
fn test_else_tag() {
    let tpl = "Hello {% if qq %}1{%elif pp%}2{%else%}3{%/if%}";
    assert_eq!(
        render(tpl, &context! { "qq" => false, "pp" => false }).unwrap(),
        "Hello 3"
    );
}

#[test]
fn test_only_first_truthy_branch_is_taken() {
    let tpl = "{% if a %}1{% elif b %}2{% elif c %}3{% /if %}";
    assert_eq!(
        render(tpl, &context! { "a" => 0, "b" => "yes", "c" => true }).unwrap(),
        "2"
    );
    assert_eq!(
        render(tpl, &context! { "a" => 0, "b" => "", "c" => vec![0] }).unwrap(),
        "3"
    );
}

#[test]
fn test_double_else_tag() {
    let tpl = "Hello {% if qq %}1{%else%}3{%elif pp%}2{%else%}3{%/if%}";
    assert!(matches!(parse_error(tpl), ParseError::ElseNotLast { .. }));
}

#[test]
fn test_double_else_end_tag() {
    let tpl = "Hello {% if qq %}13{%elif pp%}2{%else%}3{%else%}4{%/if%}";
    assert!(matches!(parse_error(tpl), ParseError::MultipleElse { .. }));
}

#[test]
fn test_for_loop_list() {
    assert_eq!(
        render(
            "{% loop items %}{{ item }}-{% /loop %}",
            &context! { "items" => vec![1, 2, 3] }
        )
        .unwrap(),
        "1-2-3-"
    );
    assert_eq!(
        render(
            "H {% loop items %}={{ item }}{% /loop %} H",
            &context! { "items" => vec![1, 2, 3] }
        )
        .unwrap(),
        "H =1=2=3 H"
    );
}

#[test]
fn test_for_loop_dict() {
    assert_eq!(
        render(
            "{% loop m %}{{ item.key }}:{{ item.value }};{% /loop %}",
            &context! { "m" => context! { "b" => 2, "a" => 1 } }
        )
        .unwrap(),
        "a:1;b:2;"
    );
}

#[test]
fn test_for_loop_if() {
    let tpl = "H {% loop items %}{% if item %}={{item}}={% /if %}{% /loop %} H";
    let items = Value::List(vec![
        Value::Bool(true),
        Value::Bool(false),
        Value::I64(1),
        Value::I64(0),
    ]);
    assert_eq!(
        render(tpl, &context! { "items" => items }).unwrap(),
        "H =true==1= H"
    );
}

#[test]
fn test_loop_does_not_leak_item() {
    let tpl = "{% loop xs %}{{ item }}{% /loop %}/{{ item }}";
    assert_eq!(
        render(tpl, &context! { "xs" => vec![1, 2], "item" => "outer" }).unwrap(),
        "12/outer"
    );
}

#[test]
fn test_literal_replacement() {
    assert_eq!(render(r"\{\{", &context! {}).unwrap(), "{{");
    assert_eq!(
        render(r"a\\b \{\{ x }}", &context! { "x" => 1 }).unwrap(),
        r"a\b {{ x }}"
    );
    // A tag right after an escaped brace still matches from that brace.
    assert_eq!(render(r"\{{ x }}", &context! { "x" => 1 }).unwrap(), r"\1");
}

#[test]
fn test_flat_key_shadows_nested_path() {
    let ctx = context! { "a.b" => "X", "a" => context! { "b" => "Y" } };
    assert_eq!(render("{{ a.b }}", &ctx).unwrap(), "X");
}

#[test]
fn test_cannot_find_end_statement() {
    for tagname in ["loop", "if"] {
        let tpl = format!("H {{% {tagname} condition %}}");
        assert!(
            matches!(parse_error(&tpl), ParseError::UnmatchedEnd { .. }),
            "{tpl}"
        );
    }
    for tagname in ["elif", "else"] {
        let tpl = format!("H {{% {tagname} condition %}}");
        assert!(
            matches!(parse_error(&tpl), ParseError::UnmatchedStart { .. }),
            "{tpl}"
        );
    }
}

#[test]
fn test_cannot_find_start_statement() {
    for tagname in ["loop", "if"] {
        let tpl = format!("H {{% /{tagname} %}} H");
        assert!(
            matches!(parse_error(&tpl), ParseError::UnmatchedStart { .. }),
            "{tpl}"
        );
    }
    for tagname in ["elif", "else"] {
        let tpl = format!("H {{% /{tagname} %}} H");
        assert!(
            matches!(parse_error(&tpl), ParseError::UnknownEndFunction { .. }),
            "{tpl}"
        );
    }
}

#[test]
fn test_mixed_statements() {
    let tags = ["loop", "if", "elif", "else"];
    for one in tags {
        for another in tags {
            if one == another {
                continue;
            }
            let tpl = format!("H {{% {one} %}} {{% / {another} %}}");
            assert!(render(&tpl, &context! { "var" => 1 }).is_err(), "{tpl}");
        }
    }
}

#[test]
fn test_mismatched_tag_type() {
    assert_eq!(
        parse_error("{% if x %}A{% /loop %}"),
        ParseError::MismatchedTag {
            expected: "loop",
            found: "if",
            tag: "{% /loop %}".to_string()
        }
    );
}

#[test]
fn test_unknown_block_tag() {
    assert!(matches!(
        parse_error("{% include header %}"),
        ParseError::UnknownStartFunction { function, .. } if function == "include"
    ));
}

#[test]
fn test_missing_key_fails_whole_render() {
    let err = render("before {{ user.name }} after", &context! { "user" => context! {} })
        .unwrap_err();
    assert_eq!(
        err,
        CurlyError::Evaluate(EvaluateError::NoSuchKey {
            key: "name".to_string(),
            context: "{}".to_string()
        })
    );
}

#[test]
fn test_loop_over_scalar_fails() {
    assert!(matches!(
        render("{% loop n %}x{% /loop %}", &context! { "n" => 3 }),
        Err(CurlyError::Evaluate(EvaluateError::NotIterable { .. }))
    ));
}

#[test]
fn test_quoted_expression_keeps_quotes() {
    let ctx = context! { "\"a b\"" => "QUOTED", "a b" => "BARE" };
    assert_eq!(render("{{ 'a b' }}", &ctx).unwrap(), "QUOTED");
    assert_eq!(render(r#"{{ "a b" }}"#, &ctx).unwrap(), "QUOTED");
}

#[test]
fn test_string_indexed_by_digit_key() {
    let ctx = context! { "s" => "abc" };
    assert_eq!(render("{{ s.0 }}{{ s.2 }}", &ctx).unwrap(), "ac");
    assert!(matches!(
        render("{{ s.3 }}", &ctx),
        Err(CurlyError::Evaluate(EvaluateError::NoSuchKey { key, .. })) if key == "3"
    ));
}

#[test]
fn test_missing_key_inside_loop_reports_item() {
    let err = render(
        "{% loop xs %}{{ nope }}{% /loop %}",
        &context! { "xs" => vec!["a"] },
    )
    .unwrap_err();
    assert_eq!(
        err,
        CurlyError::Evaluate(EvaluateError::NoSuchKey {
            key: "nope".to_string(),
            context: "{item: a, xs: [a]}".to_string()
        })
    );
}
