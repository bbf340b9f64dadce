//! Event Translator Implementation
//!
//! Translators fill a claimed slot in place between claim and publish. Closures
//! with a matching signature implement the traits directly.

/// Translates data into a pre-allocated event
///
/// # Type Parameters
/// * `T` - The event type to populate
///
/// # Examples
/// ```
/// use batchring::disruptor::EventTranslator;
///
/// #[derive(Default)]
/// struct Tick {
///     price: i64,
///     sequence: i64,
/// }
///
/// struct TickTranslator {
///     price: i64,
/// }
///
/// impl EventTranslator<Tick> for TickTranslator {
///     fn translate_to(&self, event: &mut Tick, sequence: i64) {
///         event.price = self.price;
///         event.sequence = sequence;
///     }
/// }
/// ```
pub trait EventTranslator<T> {
    /// Populate `event`, which is about to be published at `sequence`
    fn translate_to(&self, event: &mut T, sequence: i64);
}

/// Translates data plus one argument into a pre-allocated event
///
/// # Type Parameters
/// * `T` - The event type to populate
/// * `A` - The type of the argument
pub trait EventTranslatorOneArg<T, A> {
    /// Populate `event` from `arg0`
    fn translate_to(&self, event: &mut T, sequence: i64, arg0: A);
}

impl<T, F> EventTranslator<T> for F
where
    F: Fn(&mut T, i64),
{
    fn translate_to(&self, event: &mut T, sequence: i64) {
        self(event, sequence)
    }
}

impl<T, A, F> EventTranslatorOneArg<T, A> for F
where
    F: Fn(&mut T, i64, A),
{
    fn translate_to(&self, event: &mut T, sequence: i64, arg0: A) {
        self(event, sequence, arg0)
    }
}
