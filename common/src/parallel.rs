//! Row-chunked parallel processing over row-major image data.

use rayon::prelude::*;

/// Multiplier for number of chunks relative to CPU threads.
const CHUNKS_PER_THREAD: usize = 2;

/// Rows per chunk that splits `height` into roughly `threads * 2` chunks. At least 1.
#[inline]
pub fn rows_per_chunk(height: usize) -> usize {
    let num_chunks = rayon::current_num_threads() * CHUNKS_PER_THREAD;
    (height / num_chunks).max(1)
}

/// Run `f(first_row, chunk)` in parallel over bands of whole rows of `data`.
///
/// `data` must hold `width * height` elements. Each band covers
/// `rows_per_chunk(height)` rows except possibly the last.
pub fn par_row_chunks_mut<T, F>(data: &mut [T], width: usize, f: F)
where
    T: Send,
    F: Fn(usize, &mut [T]) + Sync + Send,
{
    if data.is_empty() || width == 0 {
        return;
    }
    debug_assert_eq!(data.len() % width, 0, "data is not a whole number of rows");

    let height = data.len() / width;
    let rows = rows_per_chunk(height);

    data.par_chunks_mut(rows * width)
        .enumerate()
        .for_each(|(chunk_idx, chunk)| f(chunk_idx * rows, chunk));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_per_chunk_at_least_one() {
        assert_eq!(rows_per_chunk(0), 1);
        assert_eq!(rows_per_chunk(1), 1);
        assert!(rows_per_chunk(10_000) >= 1);
    }

    #[test]
    fn test_par_row_chunks_mut_sees_every_row_once() {
        let width = 7;
        let height = 103;
        let mut data = vec![0usize; width * height];

        par_row_chunks_mut(&mut data, width, |first_row, chunk| {
            for (i, row) in chunk.chunks_mut(width).enumerate() {
                row.iter_mut().for_each(|v| *v += first_row + i);
            }
        });

        for (y, row) in data.chunks(width).enumerate() {
            assert!(row.iter().all(|&v| v == y), "row {y} visited incorrectly");
        }
    }

    #[test]
    fn test_par_row_chunks_mut_empty() {
        let mut data: Vec<f32> = Vec::new();
        par_row_chunks_mut(&mut data, 4, |_, _| panic!("must not be called"));
    }
}
