//! Prime counting kernels

/// Count primes <= n (sieve of Eratosthenes)
pub fn count_primes_up_to(n: u64) -> u64 {
    if n < 2 {
        return 0;
    }
    let n = n as usize;
    let mut is_prime = vec![true; n + 1];
    is_prime[0] = false;
    is_prime[1] = false;
    let mut i = 2;
    while i * i <= n {
        if is_prime[i] {
            let mut j = i * i;
            while j <= n {
                is_prime[j] = false;
                j += i;
            }
        }
        i += 1;
    }
    is_prime.iter().filter(|&&p| p).count() as u64
}

/// Count distinct prime divisors of n by trial division
pub fn count_prime_divisors(n: u64) -> u64 {
    if n <= 1 {
        return 0;
    }
    let mut count = 0;
    let mut n = n;
    let mut i = 2;
    while i * i <= n {
        if n % i == 0 {
            count += 1;
            while n % i == 0 {
                n /= i;
            }
        }
        i += 1;
    }
    if n > 1 {
        count += 1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_primes() {
        assert_eq!(count_primes_up_to(0), 0);
        assert_eq!(count_primes_up_to(1), 0);
        assert_eq!(count_primes_up_to(2), 1);
        assert_eq!(count_primes_up_to(10), 4); // 2, 3, 5, 7
        assert_eq!(count_primes_up_to(100), 25);
        assert_eq!(count_primes_up_to(10_000), 1229);
    }

    #[test]
    fn test_count_prime_divisors() {
        assert_eq!(count_prime_divisors(0), 0);
        assert_eq!(count_prime_divisors(1), 0);
        assert_eq!(count_prime_divisors(12), 2); // 2, 3
        assert_eq!(count_prime_divisors(13), 1);
        assert_eq!(count_prime_divisors(30), 3); // 2, 3, 5
        assert_eq!(count_prime_divisors(1024), 1);
    }
}
