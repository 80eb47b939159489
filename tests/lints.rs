use vb_lint::create_default_engine;
use vb_lint::diagnostics::{Applicability, Diagnostic, Position};
use vb_lint::error::VbLintError;

fn lint(src: &str) -> Vec<Diagnostic> {
    create_default_engine()
        .lint_source(src)
        .expect("linting should succeed")
}

fn read_only_by_ref(src: &str) -> Vec<Diagnostic> {
    lint(src)
        .into_iter()
        .filter(|d| d.lint.name == "read_only_by_ref")
        .collect()
}

/// 1-based position of the first `needle` on the line containing `line_marker`.
fn position_of(src: &str, line_marker: &str, needle: &str) -> Position {
    let (row, line) = src
        .lines()
        .enumerate()
        .find(|(_, line)| line.contains(line_marker))
        .expect("marker line");
    let byte = line.find(needle).expect("needle on marker line");
    Position {
        row: row + 1,
        column: line[..byte].chars().count() + 1,
    }
}

fn point_program(x_property: &str, call: &str) -> String {
    format!(
        r#"
Structure Point
    {x_property}
End Structure

Module Program
    Sub IncreaseByOne(ByRef x As Integer)
        x += 1
    End Sub

    Sub IncreaseByAmount(ByRef x As Integer, amount As Integer)
        x += amount
    End Sub

    Sub Main()
        Dim point As New Point
        {call}
    End Sub
End Module
"#
    )
}

#[test]
fn read_only_property_passed_by_ref_is_flagged_at_the_access() {
    let src = point_program(
        "Public ReadOnly Property X As Integer",
        "IncreaseByOne(point.X)",
    );
    let diags = read_only_by_ref(&src);

    assert_eq!(diags.len(), 1, "got: {diags:#?}");
    let d = &diags[0];
    assert_eq!(
        d.message,
        "Read-only property `point.X` is passed to a ByRef parameter; \
         the callee's writes are silently discarded"
    );
    assert_eq!(d.span.start, position_of(&src, "IncreaseByOne(point", "point.X"));
    let end = d.span.start.column + "point.X".len();
    assert_eq!(d.span.end.column, end);
}

#[test]
fn property_with_setter_is_not_flagged() {
    let src = point_program("Public Property X As Integer", "IncreaseByOne(point.X)");
    assert!(read_only_by_ref(&src).is_empty());
}

#[test]
fn named_arguments_bind_by_name_not_position() {
    let src = point_program(
        "Public ReadOnly Property X As Integer",
        "IncreaseByAmount(amount:=5, x:=point.X)",
    );
    let diags = read_only_by_ref(&src);
    assert_eq!(diags.len(), 1, "got: {diags:#?}");
    assert!(diags[0].message.contains("`point.X`"));

    // Read-only value bound to the ByVal parameter by name.
    let src = point_program(
        "Public ReadOnly Property X As Integer",
        "IncreaseByAmount(amount:=point.X, x:=total)",
    );
    assert!(read_only_by_ref(&src).is_empty());
}

#[test]
fn byval_and_input_only_parameters_never_fire() {
    let src = r#"
Class Config
    Public ReadOnly Limit As Integer
    Public ReadOnly Property Name As String
End Class

Module Program
    Sub ByValue(value As Integer)
    End Sub

    Sub ExplicitByVal(ByVal value As Integer)
    End Sub

    Sub InputOnly(<[In]> ByRef value As Integer)
    End Sub

    Sub ReadOnlyRef(<IsReadOnly> ByRef value As String)
    End Sub

    Sub Main(cfg As Config)
        ByValue(cfg.Limit)
        ExplicitByVal(cfg.Limit)
        InputOnly(cfg.Limit)
        ReadOnlyRef(cfg.Name)
    End Sub
End Module
"#;
    assert!(read_only_by_ref(src).is_empty());
}

#[test]
fn read_only_field_of_a_class_is_flagged_as_field() {
    let src = r#"
Class Counter
    Public ReadOnly Count As Integer
    Public Total As Integer
End Class

Module Program
    Sub Bump(ByRef n As Integer)
        n += 1
    End Sub

    Sub Main()
        Dim c As New Counter()
        Bump(c.Count)
        Bump(c.Total)
    End Sub
End Module
"#;
    let diags = read_only_by_ref(src);
    assert_eq!(diags.len(), 1, "got: {diags:#?}");
    assert!(diags[0].message.starts_with("Read-only field `c.Count`"));
}

#[test]
fn read_only_value_receiver_is_reported_at_the_receiver() {
    let src = r#"
Structure Point
    Public X As Integer
    Public Property Y As Integer
End Structure

Class Shape
    Private ReadOnly origin As Point
    Private corner As Point

    Sub Bump(ByRef n As Integer)
    End Sub

    Sub Move()
        Bump(origin.X) ' origin
        Bump(Me.origin.Y) ' me-origin
        Bump(corner.X)
    End Sub
End Class
"#;
    let diags = read_only_by_ref(src);
    assert_eq!(diags.len(), 2, "got: {diags:#?}");

    assert_eq!(diags[0].span.start, position_of(src, "' origin", "origin"));
    assert_eq!(
        diags[0].message,
        "Read-only field `origin` is passed to a ByRef parameter; \
         the callee's writes are silently discarded"
    );
    assert_eq!(diags[1].span.start, position_of(src, "' me-origin", "Me.origin"));
    assert!(diags[1].message.contains("`Me.origin`"));
}

#[test]
fn reference_type_member_stops_propagation() {
    let src = r#"
Class Box
    Public Value As Integer
End Class

Structure Holder
    Public Item As Box
End Structure

Class Owner
    Private ReadOnly _holder As Holder
    Private ReadOnly _box As Box

    Sub Bump(ByRef n As Integer)
    End Sub

    Sub Run()
        Bump(_holder.Item.Value)
        Bump(_box.Value)
    End Sub
End Class
"#;
    assert!(read_only_by_ref(src).is_empty());
}

#[test]
fn expanded_properties_follow_their_accessors() {
    let src = r#"
Class Account
    Private _balance As Integer

    Public ReadOnly Property Balance As Integer
        Get
            Return _balance
        End Get
    End Property

    Public Property Limit As Integer
        Get
            Return 0
        End Get
        Private Set(value As Integer)
        End Set
    End Property

    Public Property Rate As Integer
        Get
            Return 1
        End Get
    End Property

    Sub Adjust(ByRef n As Integer)
    End Sub

    Sub Run()
        Adjust(Balance) ' balance
        Adjust(Limit)
        Adjust(Rate) ' rate
        Adjust(_balance)
    End Sub
End Class
"#;
    let diags = read_only_by_ref(src);
    assert_eq!(diags.len(), 2, "got: {diags:#?}");
    assert_eq!(diags[0].span.start, position_of(src, "' balance", "Balance"));
    assert!(diags[0].message.starts_with("Read-only property `Balance`"));
    assert_eq!(diags[1].span.start, position_of(src, "' rate", "Rate"));
}

#[test]
fn locals_parameters_calls_and_literals_are_writable() {
    let src = r#"
Class Source
    Public ReadOnly Property Value As Integer
    Public Function Compute() As Integer
        Return 1
    End Function
End Class

Module Program
    Sub Bump(ByRef n As Integer)
    End Sub

    Sub Main(p As Integer, s As Source)
        Dim local As Integer = 3
        Bump(local)
        Bump(p)
        Bump(s.Compute())
        Bump(42)
        Bump((s.Value))
        Bump(s.Value + 1)
        Bump(CInt(s.Value))
    End Sub
End Module
"#;
    assert!(read_only_by_ref(src).is_empty());
}

#[test]
fn unresolved_targets_and_symbols_fail_open() {
    let src = r#"
Class Thing
    Public ReadOnly Value As Integer
    Sub Twice(ByRef a As Integer)
    End Sub
    Sub Twice(ByRef a As Integer, ByRef b As Integer)
    End Sub
    Sub Many(ByRef first As Integer, ParamArray rest As Integer())
    End Sub
End Class

Module Program
    Sub Main(t As Thing, unknown As Object)
        External.Mutate(t.Value)
        unknown.Mutate(t.Value)
        t.Missing(t.Value)
        t.Twice(missing:=t.Value)
        t.Many(1, t.Value, t.Value)
        t.Twice(unknown.Value)
    End Sub
End Module
"#;
    assert!(read_only_by_ref(src).is_empty());
}

#[test]
fn overloads_resolve_when_unambiguous() {
    let src = r#"
Class Thing
    Public ReadOnly Value As Integer
    Sub Store(ByRef a As Integer)
    End Sub
    Sub Store(ByRef a As Integer, ByRef b As Integer, ByRef c As Integer)
    End Sub
End Class

Module Program
    Sub Main(t As Thing)
        t.Store(1, 2, t.Value)
    End Sub
End Module
"#;
    let diags = read_only_by_ref(src);
    assert_eq!(diags.len(), 1, "got: {diags:#?}");
}

#[test]
fn constructor_arguments_are_call_sites() {
    let src = r#"
Class Settings
    Public ReadOnly Property Size As Integer
End Class

Class Buffer
    Public Sub New(ByRef capacity As Integer)
    End Sub
End Class

Module Program
    Sub Main(s As Settings)
        Dim b = New Buffer(s.Size)
    End Sub
End Module
"#;
    let diags = read_only_by_ref(src);
    assert_eq!(diags.len(), 1, "got: {diags:#?}");
    assert!(diags[0].message.contains("`s.Size`"));
}

#[test]
fn inherited_members_and_module_methods_resolve() {
    let src = r#"
Class Base
    Protected ReadOnly Id As Integer
End Class

Class Derived
    Inherits Base

    Sub Run()
        Helpers.Touch(Id)
        Touch(MyBase.Id)
    End Sub
End Class

Module Helpers
    Sub Touch(ByRef value As Integer)
    End Sub
End Module
"#;
    let diags = read_only_by_ref(src);
    assert_eq!(diags.len(), 2, "got: {diags:#?}");
}

#[test]
fn const_fields_are_not_storage() {
    let src = r#"
Class Limits
    Public Const Max As Integer = 10
End Class

Module Program
    Sub Bump(ByRef n As Integer)
    End Sub

    Sub Main()
        Bump(Limits.Max)
    End Sub
End Module
"#;
    assert!(read_only_by_ref(src).is_empty());
}

#[test]
fn diagnostics_carry_help_and_a_parenthesizing_suggestion() {
    let src = point_program(
        "Public ReadOnly Property X As Integer",
        "IncreaseByOne(point.X)",
    );
    let diags = read_only_by_ref(&src);
    let d = &diags[0];
    assert!(d.help.as_deref().is_some_and(|h| h.contains("(point.X)")));
    let suggestion = d.suggestion.as_ref().expect("suggestion");
    assert_eq!(suggestion.replacement, "(point.X)");
    assert_eq!(suggestion.applicability, Applicability::MaybeIncorrect);
}

#[test]
fn syntax_errors_elsewhere_do_not_hide_findings() {
    let src = point_program(
        "Public ReadOnly Property X As Integer",
        "With point\n        IncreaseByOne(point.X)",
    );
    let diags = read_only_by_ref(&src);
    assert_eq!(diags.len(), 1, "got: {diags:#?}");

    let err = create_default_engine()
        .lint_source_strict(&src)
        .expect_err("strict linting stops at the syntax error");
    let VbLintError::Syntax(errors) = &err else {
        panic!("expected syntax errors, got {err:?}");
    };
    assert_eq!(errors.len(), 1);
    assert!(err.to_string().starts_with("1 syntax error(s): "), "{err}");
}

#[test]
fn deep_value_chains_do_not_overflow() {
    // Parsing, binding, the walk and dropping the tree all run at this depth.
    let depth = 100_000;
    let chain = vec!["Inner"; depth].join(".");
    let src = format!(
        "Structure Node\n    Public Inner As Node\n    Public Leaf As Integer\nEnd Structure\n\n\
         Class Tree\n    Private ReadOnly root As Node\n\
         \x20   Sub Bump(ByRef n As Integer)\n    End Sub\n\
         \x20   Sub Run()\n        Bump(root.{chain}.Leaf)\n    End Sub\nEnd Class\n"
    );

    let diags = read_only_by_ref(&src);
    assert_eq!(diags.len(), 1);
    assert!(diags[0].message.starts_with("Read-only field `root`"));
}

#[test]
fn deeply_parenthesised_arguments_are_skipped_not_fatal() {
    let depth = 50_000;
    let src = format!(
        "Class Counter\n    Private ReadOnly total As Integer\n\
         \x20   Sub Bump(ByRef n As Integer)\n    End Sub\n\
         \x20   Sub Run()\n        Bump({}total{})\n        Bump(total)\n    End Sub\nEnd Class\n",
        "(".repeat(depth),
        ")".repeat(depth)
    );

    let diags = read_only_by_ref(&src);
    assert_eq!(diags.len(), 1);
    assert_eq!(diags[0].span.start.row, 7);
}

#[test]
fn one_engine_lints_many_sources_concurrently() {
    let engine = create_default_engine();
    let flagged = point_program(
        "Public ReadOnly Property X As Integer",
        "IncreaseByOne(point.X)",
    );
    let clean = point_program("Public Property X As Integer", "IncreaseByOne(point.X)");

    let counts: Vec<usize> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let engine = &engine;
                let src = if i % 2 == 0 { &flagged } else { &clean };
                scope.spawn(move || engine.lint_source(src).expect("lint").len())
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("thread"))
            .collect()
    });

    assert_eq!(counts, vec![1, 0, 1, 0, 1, 0, 1, 0]);
}
