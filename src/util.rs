/// A const generic version of arrayref
#[inline]
pub(crate) fn get_split<const N: usize>(data: &[u8]) -> Option<([u8; N], &[u8])> {
    let (head, rest) = data.split_first_chunk::<N>()?;
    Some((*head, rest))
}

#[inline]
pub(crate) fn get_array<const N: usize>(data: &[u8]) -> Option<[u8; N]> {
    get_split::<N>(data).map(|(head, _)| head)
}

/// Number of bytes in `data` from `offset` onwards, zero when the offset is
/// past the end
#[inline]
pub(crate) fn remaining(data: &[u8], offset: usize) -> usize {
    data.len().saturating_sub(offset)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::*;

    #[rstest]
    #[case(&[1, 2, 3][..], Some([1, 2]))]
    #[case(&[1, 2][..], Some([1, 2]))]
    #[case(&[1][..], None)]
    #[case(&[][..], None)]
    fn test_get_array(#[case] input: &[u8], #[case] expected: Option<[u8; 2]>) {
        assert_eq!(get_array::<2>(input), expected);
    }

    #[test]
    fn test_get_split_rest() {
        let (head, rest) = get_split::<1>(&[4, 5, 6]).unwrap();
        assert_eq!(head, [4]);
        assert_eq!(rest, &[5, 6]);
    }

    #[test]
    fn test_remaining() {
        assert_eq!(remaining(&[0; 4], 1), 3);
        assert_eq!(remaining(&[0; 4], 9), 0);
    }
}
