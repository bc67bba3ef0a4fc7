/// Invoke another macro once per tuple prefix, longest first.
#[macro_export]
macro_rules! for_each_tuple {
    ($m:ident !! $head_ty:ident) => {
        $m!($head_ty);
    };
    ($m:ident !! $head_ty:ident, $($tail_ty:ident),*) => (
        $m!($head_ty, $( $tail_ty ),*);
        $crate::for_each_tuple!($m !! $( $tail_ty ),*);
    );
}

/// Apply a macro to every tuple arity from 1 up to 16.
#[macro_export]
macro_rules! impl_for_tuples {
    ($m:ident) => {
        $crate::for_each_tuple!($m !! A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P);
    };
}

#[cfg(test)]
mod tests {
    use std::marker::PhantomData;

    struct Arity<Params>(PhantomData<Params>);

    macro_rules! count_params {
         ($($name: ident),*) => {
            #[allow(dead_code)]
            impl<$($name),*> Arity<($($name,)*)> {
                pub fn count(&self) -> usize {
                    [$(stringify!($name)),*].len()
                 }
            }
        }
    }

    impl_for_tuples!(count_params);

    #[test]
    fn expands_every_arity() {
        // Given
        let one = Arity::<(u8,)>(PhantomData);
        let four = Arity::<(u8, u16, u32, u64)>(PhantomData);

        // Then
        assert_eq!(one.count(), 1);
        assert_eq!(four.count(), 4);
    }
}
