use tessera_testhelpers::test;

#[test]
fn body_runs_inside_the_test_span() {
    // a custom filter may disable the span
    if std::env::var_os("TESSERA_LOG").is_some() {
        return;
    }
    let current = tracing::Span::current();
    assert_eq!(current.metadata().map(|m| m.name()), Some("test"));
    tracing::debug!("attributed to body_runs_inside_the_test_span");
}

#[test]
fn result_returning_tests_keep_their_signature() -> Result<(), std::num::ParseIntError> {
    let n: u8 = "42".parse()?;
    assert_eq!(n, 42);
    Ok(())
}
