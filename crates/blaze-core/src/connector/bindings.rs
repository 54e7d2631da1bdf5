//! Bindings - view state の宣言
//!
//! view state の各フィールドは次のどれかで宣言します。
//! - **Constant**: 固定値
//! - **Stream**: ストリームと初期値の組
//! - **FromProps**: 現在の props からの導出
//!
//! # スナップショット
//! 各フィールドのストリームは初期値から始まり（`start_with`）、
//! 直前の値と同じなら捨てられ（`distinct_until_changed`）、
//! 最後に `combine_latest` で 1 つのスナップショットにまとめられます。
//! したがって、スナップショットはどれかのフィールドが変化したときだけ流れ、
//! 一部のフィールドだけが埋まった状態が流れることはありません。

use std::fmt::{self, Debug};
use std::rc::Rc;

use tracing::debug;

use super::Diagnostics;
use crate::rx::{Observable, combine_latest};

/// 1 つのフィールドの値の出どころ
pub enum Binding<P, F: 'static> {
    Constant(F),
    Stream(Observable<F>, F),
    FromProps(Rc<dyn Fn(&P) -> F>),
}

impl<P: Clone + 'static, F: Clone + 'static> Binding<P, F> {
    pub fn constant(value: F) -> Self {
        Binding::Constant(value)
    }

    /// ストリームに束ねる（最初の描画では `initial` を使う）
    pub fn stream(source: Observable<F>, initial: F) -> Self {
        Binding::Stream(source, initial)
    }

    pub fn from_props(derive: impl Fn(&P) -> F + 'static) -> Self {
        Binding::FromProps(Rc::new(derive))
    }

    /// 初期 props に対する値（同期的に決まる）
    pub fn initial(&self, props: &P) -> F {
        match self {
            Binding::Constant(value) => value.clone(),
            Binding::Stream(_, initial) => initial.clone(),
            Binding::FromProps(derive) => derive(props),
        }
    }

    /// 初期値から始まるフィールドのストリーム
    fn source(&self, props: &Observable<P>) -> Observable<F> {
        match self {
            Binding::Constant(value) => Observable::of(value.clone()),
            Binding::Stream(source, initial) => source.start_with(initial.clone()),
            Binding::FromProps(derive) => {
                let derive = derive.clone();
                props.map(move |props| derive(&props))
            }
        }
    }
}

impl<P: Clone + 'static> Binding<P, P> {
    /// props をそのまま渡す
    pub fn pass() -> Self {
        Binding::FromProps(Rc::new(|props: &P| props.clone()))
    }
}

impl<P, F: Debug> Debug for Binding<P, F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Constant(value) => f.debug_tuple("Constant").field(value).finish(),
            Binding::Stream(_, initial) => f.debug_tuple("Stream").field(initial).finish(),
            Binding::FromProps(_) => f.write_str("FromProps"),
        }
    }
}

type Patch<S> = Rc<dyn Fn(&mut S)>;

struct FieldBinding<P: 'static, S: 'static> {
    name: &'static str,
    initial: Box<dyn Fn(&P, &mut S)>,
    stream: Box<dyn Fn(&Observable<P>, &Diagnostics) -> Observable<Patch<S>>>,
}

/// ViewBindings は view state のフィールド宣言の集まり
///
/// 宣言されなかったフィールドは `S::default()` の値のままです。
///
/// # 使用例
/// ```ignore
/// let bindings = ViewBindings::new()
///     .field("val", Binding::stream(count$, 0), |s: &mut CounterState, v| s.val = v)
///     .field("title", Binding::from_props(|p: &Props| p.title.clone()), |s, v| s.title = v);
/// ```
pub struct ViewBindings<P: 'static, S: 'static> {
    fields: Vec<FieldBinding<P, S>>,
}

impl<P: Clone + 'static, S: Default + Clone + 'static> Default for ViewBindings<P, S> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Clone + 'static, S: Default + Clone + 'static> ViewBindings<P, S> {
    pub fn new() -> Self {
        Self { fields: Vec::new() }
    }

    /// フィールドを宣言（同じ名前の宣言は置き換え）
    pub fn field<F>(
        mut self,
        name: &'static str,
        binding: Binding<P, F>,
        set: impl Fn(&mut S, F) + 'static,
    ) -> Self
    where
        F: Clone + PartialEq + Debug + 'static,
    {
        let set = Rc::new(set);
        let binding = Rc::new(binding);

        let initial = {
            let set = set.clone();
            let binding = binding.clone();
            Box::new(move |props: &P, state: &mut S| set(state, binding.initial(props)))
        };
        let stream = Box::new(move |props: &Observable<P>, diagnostics: &Diagnostics| {
            let set = set.clone();
            let diagnostics = diagnostics.clone();
            binding
                .source(props)
                .distinct_until_changed()
                .tap(move |value| {
                    if diagnostics.debug {
                        debug!(component = %diagnostics.component, field = name, ?value, "view state");
                    }
                })
                .map(move |value| {
                    let set = set.clone();
                    Rc::new(move |state: &mut S| set(state, value.clone())) as Patch<S>
                })
        });

        self.fields.retain(|field| field.name != name);
        self.fields.push(FieldBinding {
            name,
            initial,
            stream,
        });
        self
    }

    pub fn field_names(&self) -> Vec<&'static str> {
        self.fields.iter().map(|field| field.name).collect()
    }

    /// 初期スナップショット（どのイベントも待たない）
    pub fn initial_state(&self, props: &P) -> S {
        let mut state = S::default();
        for field in &self.fields {
            (field.initial)(props, &mut state);
        }
        state
    }

    /// フィールドを結合したスナップショットのストリーム
    ///
    /// 購読と同時に初期スナップショットを 1 つ流します。
    pub(crate) fn snapshot_stream(
        &self,
        props: &Observable<P>,
        diagnostics: &Diagnostics,
    ) -> Observable<S> {
        if self.fields.is_empty() {
            return Observable::of(S::default());
        }
        let patches: Vec<Observable<Patch<S>>> = self
            .fields
            .iter()
            .map(|field| (field.stream)(props, diagnostics))
            .collect();
        combine_latest(patches).map(|patches| {
            let mut state = S::default();
            for patch in &patches {
                patch(&mut state);
            }
            state
        })
    }
}
